use crate::types::DocId;

/// Error taxonomy shared by every backend and the presentation layer.
///
/// `Auth`, `Connection` and `Write` are the three backend failure kinds.
/// The remaining variants are raised client-side before anything is sent.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DocId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Sign-in or sign-out failed, or the operation needs a signed-in user.
    #[error("Auth error: {0}")]
    Auth(String),

    /// A subscription or query could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A mutation or upload was rejected.
    #[error("Write error: {0}")]
    Write(String),

    /// A stored document does not match the expected model.
    #[error("Malformed document: {0}")]
    Decode(String),
}

impl CoreError {
    /// Short machine-readable code, used in log fields and HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::Auth(_) => "AUTH_ERROR",
            CoreError::Connection(_) => "CONNECTION_ERROR",
            CoreError::Write(_) => "WRITE_ERROR",
            CoreError::Decode(_) => "DECODE_ERROR",
        }
    }
}
