//! Column whitelist per collection.
//!
//! Field names end up inside SQL text (column lists and `ORDER BY`), so
//! only names listed here are ever interpolated.

use notesync_core::document::Collection;
use notesync_core::error::CoreError;
use notesync_core::query::field;

const FOLDER_COLUMNS: &[&str] = &[field::ID, field::USER_ID, field::NAME, field::DESCRIPTION];

const NOTE_COLUMNS: &[&str] = &[
    field::ID,
    field::USER_ID,
    field::FOLDER_ID,
    field::TITLE,
    field::CONTENT,
    field::IS_PUBLIC,
    field::IMAGES,
    field::CREATED_AT,
    field::UPDATED_AT,
];

const COMMENT_COLUMNS: &[&str] = &[
    field::ID,
    field::NOTE_ID,
    field::USER_ID,
    field::USER_NAME,
    field::TEXT,
    field::CREATED_AT,
];

pub fn columns(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Folders => FOLDER_COLUMNS,
        Collection::Notes => NOTE_COLUMNS,
        Collection::Comments => COMMENT_COLUMNS,
    }
}

/// Return the whitelisted column for `name`, or a validation error.
pub fn column(collection: Collection, name: &str) -> Result<&'static str, CoreError> {
    columns(collection)
        .iter()
        .copied()
        .find(|c| *c == name)
        .ok_or_else(|| {
            CoreError::Validation(format!("Unknown field '{name}' for {collection}"))
        })
}
