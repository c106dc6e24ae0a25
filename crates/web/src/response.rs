//! Shared response envelope types for handlers.

use axum::http::StatusCode;
use axum::Json;
use notesync_core::types::DocId;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Outcome of a fire-and-forget mutation.
///
/// `accepted: false` means the write failed, was logged, and nothing
/// changed.
#[derive(Debug, Default, Serialize)]
pub struct Accepted {
    pub accepted: bool,
    /// Id of the created document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DocId>,
    /// Download reference of an attached image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// `202 Accepted` with a bare [`Accepted`] body.
pub fn accepted(accepted: bool) -> (StatusCode, Json<Accepted>) {
    (
        StatusCode::ACCEPTED,
        Json(Accepted {
            accepted,
            ..Default::default()
        }),
    )
}

/// `202 Accepted` carrying the id of the created document, if any.
pub fn accepted_with_id(id: Option<DocId>) -> (StatusCode, Json<Accepted>) {
    (
        StatusCode::ACCEPTED,
        Json(Accepted {
            accepted: id.is_some(),
            id,
            reference: None,
        }),
    )
}

/// `202 Accepted` carrying the stored image reference, if any.
pub fn accepted_with_reference(reference: Option<String>) -> (StatusCode, Json<Accepted>) {
    (
        StatusCode::ACCEPTED,
        Json(Accepted {
            accepted: reference.is_some(),
            id: None,
            reference,
        }),
    )
}
