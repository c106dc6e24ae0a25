pub mod files;
pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use notesync_core::storage::MAX_IMAGE_BYTES;

use crate::handlers::{folders, live, notes, profile, session};
use crate::state::AppState;

/// Headroom for multipart framing around the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the page and mutation route tree.
///
/// ```text
/// GET  /                          landing or home feed
/// GET  /signin                    sign-in form
/// POST /signin                    sign in
/// POST /signout                   sign out
/// GET  /profile                   profile
/// GET  /folders                   folder list
/// POST /folders                   create folder
/// GET  /folders/{id}              notes in folder
/// PUT  /folders/{id}              edit folder
/// GET  /add-note                  add-note form
/// GET  /add-note/{folder_id}      add-note form, folder preselected
/// POST /add-note                  create note
/// GET  /note/{id}                 note detail
/// PUT  /note/{id}                 save edit
/// POST /note/{id}/visibility      toggle visibility
/// POST /note/{id}/images          attach image (multipart)
/// POST /note/{id}/comments        post comment
/// GET  /live/...                  WebSocket snapshot streams
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(session::root))
        .route("/signin", get(session::sign_in_form).post(session::sign_in))
        .route("/signout", post(session::sign_out))
        .route("/profile", get(profile::profile))
        .route("/folders", get(folders::list).post(folders::create))
        .route("/folders/{id}", get(folders::notes).put(folders::edit))
        .route("/add-note", get(notes::add_note).post(notes::submit_note))
        .route("/add-note/{folder_id}", get(notes::add_note_in_folder))
        .route("/note/{id}", get(notes::detail).put(notes::save))
        .route("/note/{id}/visibility", post(notes::toggle_visibility))
        .route(
            "/note/{id}/images",
            post(notes::attach_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/note/{id}/comments", post(notes::post_comment))
        .nest("/live", live_routes())
}

/// Routes mounted at `/live`.
fn live_routes() -> Router<AppState> {
    Router::new()
        .route("/feed", get(live::feed))
        .route("/folders", get(live::folders))
        .route("/folders/{id}", get(live::folder_notes))
        .route("/note/{id}/comments", get(live::comments))
}
