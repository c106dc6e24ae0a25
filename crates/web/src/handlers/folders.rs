//! Handlers for the folder list and the notes within one folder.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use notesync_client::gateway::settle;
use notesync_client::views::{FolderListView, FolderNotesView, NoteSummary};
use notesync_core::models::{Folder, FolderInput};
use notesync_core::types::DocId;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::{accepted, accepted_with_id, Accepted, DataResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FolderNotes {
    pub folder_id: DocId,
    pub folder_name: String,
    pub notes: Vec<NoteSummary>,
}

/// GET /folders
pub async fn list(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Folder>>>> {
    let view = FolderListView::open(&state.client).await?;
    let folders = view.folders();
    view.close();
    Ok(Json(DataResponse { data: folders }))
}

/// POST /folders
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<FolderInput>,
) -> (StatusCode, Json<Accepted>) {
    let id = settle("create_folder", state.client.gateway.create_folder(&input).await);
    accepted_with_id(id)
}

/// PUT /folders/{id}
pub async fn edit(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
    Json(input): Json<FolderInput>,
) -> (StatusCode, Json<Accepted>) {
    let result = state.client.gateway.update_folder(&folder_id, &input).await;
    accepted(settle("update_folder", result).is_some())
}

/// GET /folders/{id}
pub async fn notes(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
) -> AppResult<Json<DataResponse<FolderNotes>>> {
    let view = FolderNotesView::open(&state.client, &folder_id).await?;
    let data = FolderNotes {
        folder_id: view.folder_id().to_string(),
        folder_name: view.folder_name(),
        notes: view.notes(),
    };
    view.close();
    Ok(Json(DataResponse { data }))
}
