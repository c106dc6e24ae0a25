use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::document::{Collection, Document};
use crate::error::CoreError;
use crate::types::DocId;

/// A user-owned container of notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: DocId,
    pub user_id: DocId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Document for Folder {
    const COLLECTION: Collection = Collection::Folders;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Name and description, used both to create and to edit a folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FolderInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
}

impl FolderInput {
    pub fn check(&self) -> Result<(), CoreError> {
        super::ensure_not_blank("name", &self.name)?;
        super::run_validator(self)
    }
}
