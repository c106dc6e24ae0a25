use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::document::{Collection, Document};
use crate::error::CoreError;
use crate::types::{DocId, Timestamp};

/// A note inside one folder. Visibility is a plain boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: DocId,
    pub user_id: DocId,
    pub folder_id: DocId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_public: bool,
    /// Download references, in upload order. Append-only.
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl Document for Note {
    const COLLECTION: Collection = Collection::Notes;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Input of the add-note form.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewNote {
    pub folder_id: DocId,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100_000))]
    pub content: String,
    #[serde(default)]
    pub is_public: bool,
}

impl NewNote {
    pub fn check(&self) -> Result<(), CoreError> {
        super::ensure_not_blank("folder_id", &self.folder_id)?;
        super::ensure_not_blank("title", &self.title)?;
        super::ensure_not_blank("content", &self.content)?;
        super::run_validator(self)
    }
}

/// The editable part of a note, saved in one write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NoteEdit {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 100_000))]
    pub content: String,
    pub is_public: bool,
}

impl NoteEdit {
    pub fn check(&self) -> Result<(), CoreError> {
        super::ensure_not_blank("title", &self.title)?;
        super::run_validator(self)
    }
}

impl From<&Note> for NoteEdit {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            is_public: note.is_public,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn note_decodes_with_defaults() {
        let note: Note = serde_json::from_str(
            r#"{"id":"n1","user_id":"u1","folder_id":"f1","title":"T","created_at":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert!(!note.is_public);
        assert!(note.images.is_empty());
        assert!(note.updated_at.is_none());
    }

    #[test]
    fn new_note_requires_folder_title_and_content() {
        let mut input = NewNote {
            folder_id: "f1".into(),
            title: "Soup".into(),
            content: "Boil water".into(),
            is_public: false,
        };
        assert!(input.check().is_ok());

        input.folder_id = String::new();
        assert_matches!(input.check(), Err(CoreError::Validation(_)));

        input.folder_id = "f1".into();
        input.content = "\n".into();
        assert_matches!(input.check(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn edit_allows_empty_content_but_not_empty_title() {
        let edit = NoteEdit {
            title: "T".into(),
            content: String::new(),
            is_public: true,
        };
        assert!(edit.check().is_ok());

        let edit = NoteEdit {
            title: " ".into(),
            ..edit
        };
        assert_matches!(edit.check(), Err(CoreError::Validation(_)));
    }
}
