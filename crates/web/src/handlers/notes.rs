//! Handlers for the add-note form and the note detail screen.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use notesync_client::attachments::ImageUpload;
use notesync_client::gateway::settle;
use notesync_client::views::{AddNoteView, NoteDetailView, NoteState};
use notesync_core::error::CoreError;
use notesync_core::models::{Comment, Folder, NewComment, Note, NoteEdit};
use notesync_core::types::DocId;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::{accepted, accepted_with_id, accepted_with_reference, Accepted, DataResponse};
use crate::state::AppState;

/// Multipart field carrying the image.
const UPLOAD_FIELD: &str = "file";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AddNoteForm {
    pub folders: Vec<Folder>,
    pub selected_folder: Option<DocId>,
}

#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    /// Falls back to the first folder when absent.
    #[serde(default)]
    pub folder_id: Option<DocId>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Serialize)]
pub struct NoteDetail {
    pub note: Note,
    pub is_owner: bool,
    pub comments: Vec<Comment>,
}

// ---------------------------------------------------------------------------
// Add note
// ---------------------------------------------------------------------------

async fn add_note_form(state: &AppState, folder_id: Option<&str>) -> AppResult<Json<DataResponse<AddNoteForm>>> {
    let view = AddNoteView::load(&state.client, folder_id).await?;
    Ok(Json(DataResponse {
        data: AddNoteForm {
            folders: view.folders().to_vec(),
            selected_folder: view.selected_folder().map(str::to_string),
        },
    }))
}

/// GET /add-note
pub async fn add_note(State(state): State<AppState>) -> AppResult<Json<DataResponse<AddNoteForm>>> {
    add_note_form(&state, None).await
}

/// GET /add-note/{folder_id}
pub async fn add_note_in_folder(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
) -> AppResult<Json<DataResponse<AddNoteForm>>> {
    add_note_form(&state, Some(&folder_id)).await
}

/// POST /add-note
pub async fn submit_note(
    State(state): State<AppState>,
    Json(input): Json<AddNoteRequest>,
) -> (StatusCode, Json<Accepted>) {
    let loaded = AddNoteView::load(&state.client, input.folder_id.as_deref()).await;
    let id = match settle("create_note", loaded) {
        Some(view) => view.submit(&input.title, &input.content, input.is_public).await,
        None => None,
    };
    accepted_with_id(id)
}

// ---------------------------------------------------------------------------
// Note detail
// ---------------------------------------------------------------------------

/// GET /note/{id}
pub async fn detail(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> AppResult<Json<DataResponse<NoteDetail>>> {
    let view = NoteDetailView::open(&state.client, &note_id).await?;
    let data = match view.state() {
        NoteState::Found(note) => NoteDetail {
            note: note.clone(),
            is_owner: view.is_owner(),
            comments: view.comments(),
        },
        NoteState::NotFound => {
            view.close();
            return Err(AppError::Core(CoreError::NotFound {
                entity: "Note",
                id: note_id,
            }));
        }
    };
    view.close();
    Ok(Json(DataResponse { data }))
}

/// PUT /note/{id}
pub async fn save(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    Json(edit): Json<NoteEdit>,
) -> (StatusCode, Json<Accepted>) {
    let result = state.client.gateway.update_note(&note_id, &edit).await;
    accepted(settle("update_note", result).is_some())
}

/// POST /note/{id}/visibility
pub async fn toggle_visibility(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> (StatusCode, Json<Accepted>) {
    let result = state.client.gateway.toggle_visibility(&note_id).await;
    accepted(settle("toggle_visibility", result).is_some())
}

/// POST /note/{id}/images
///
/// Expects one multipart field named `file`.
pub async fn attach_image(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Accepted>)> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some(ImageUpload {
            file_name,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload = upload
        .ok_or_else(|| AppError::BadRequest(format!("Missing multipart field '{UPLOAD_FIELD}'")))?;
    let result = state.client.attachments.attach(&note_id, upload).await;
    Ok(accepted_with_reference(settle("attach_image", result)))
}

/// POST /note/{id}/comments
pub async fn post_comment(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    Json(input): Json<NewComment>,
) -> (StatusCode, Json<Accepted>) {
    let result = state.client.gateway.post_comment(&note_id, &input).await;
    accepted_with_id(settle("post_comment", result))
}
