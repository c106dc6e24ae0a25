use axum::extract::State;
use axum::Json;
use notesync_client::views::ProfileView;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /profile
///
/// Backend failures are reported inside the view, not as an error status.
pub async fn profile(State(state): State<AppState>) -> AppResult<Json<DataResponse<ProfileView>>> {
    let view = ProfileView::load(&state.client).await?;
    Ok(Json(DataResponse { data: view }))
}
