use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::document::{Collection, Document};
use crate::error::CoreError;
use crate::types::{DocId, Timestamp};

/// A comment on a note. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: DocId,
    pub note_id: DocId,
    pub user_id: DocId,
    pub user_name: String,
    pub text: String,
    pub created_at: Timestamp,
}

impl Document for Comment {
    const COLLECTION: Collection = Collection::Comments;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewComment {
    #[validate(length(max = 5000))]
    pub text: String,
}

impl NewComment {
    /// Whitespace-only text never reaches the store.
    pub fn check(&self) -> Result<(), CoreError> {
        super::ensure_not_blank("text", &self.text)?;
        super::run_validator(self)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn whitespace_comment_is_rejected() {
        for text in ["", "   ", "\n\t"] {
            let input = NewComment { text: text.into() };
            assert_matches!(input.check(), Err(CoreError::Validation(_)));
        }
    }

    #[test]
    fn regular_comment_passes() {
        let input = NewComment {
            text: "Nice recipe".into(),
        };
        assert!(input.check().is_ok());
    }
}
