//! Entity models and their create/edit inputs.

pub mod comment;
pub mod folder;
pub mod identity;
pub mod note;

pub use comment::{Comment, NewComment};
pub use folder::{Folder, FolderInput};
pub use identity::Identity;
pub use note::{NewNote, Note, NoteEdit};

use crate::error::CoreError;

/// Reject empty or whitespace-only text.
pub fn ensure_not_blank(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}

/// Run `validator` rules and fold the report into a [`CoreError`].
pub(crate) fn run_validator(input: &impl validator::Validate) -> Result<(), CoreError> {
    input
        .validate()
        .map_err(|e| CoreError::Validation(e.to_string()))
}
