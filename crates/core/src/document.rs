//! Untyped documents as they travel between backends and view-models.
//!
//! Backends only ever see [`RawDocument`]s (an id plus a JSON field map).
//! The typed layer decodes them into models implementing [`Document`].

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DocId, Fields};

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// A named set of documents of one kind in the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Folders,
    Notes,
    Comments,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Folders, Collection::Notes, Collection::Comments];

    /// Storage name (table / collection name on every backend).
    pub fn name(self) -> &'static str {
        match self {
            Self::Folders => "folders",
            Self::Notes => "notes",
            Self::Comments => "comments",
        }
    }

    /// Parse a storage name back into a collection.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "folders" => Some(Self::Folders),
            "notes" => Some(Self::Notes),
            "comments" => Some(Self::Comments),
            _ => None,
        }
    }

    /// Singular entity label used in error messages.
    pub fn entity(self) -> &'static str {
        match self {
            Self::Folders => "Folder",
            Self::Notes => "Note",
            Self::Comments => "Comment",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// RawDocument
// ---------------------------------------------------------------------------

/// A stored document: its id and its field map (the id is not repeated
/// inside `fields`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: DocId,
    pub fields: Fields,
}

impl RawDocument {
    pub fn new(id: impl Into<DocId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Split a flat JSON object that carries its own `id` field.
    ///
    /// Returns `None` when the value is not an object or has no string id.
    pub fn from_flat(value: serde_json::Value) -> Option<Self> {
        let serde_json::Value::Object(mut fields) = value else {
            return None;
        };
        let id = match fields.remove("id")? {
            serde_json::Value::String(id) => id,
            _ => return None,
        };
        Some(Self { id, fields })
    }

    /// The inverse of [`from_flat`](Self::from_flat).
    pub fn into_flat(self) -> serde_json::Value {
        let mut fields = self.fields;
        fields.insert("id".into(), serde_json::Value::String(self.id));
        serde_json::Value::Object(fields)
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A typed model stored in one [`Collection`].
pub trait Document: DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}

/// Decode a raw document into its typed model.
pub fn decode<T: Document>(raw: &RawDocument) -> Result<T, CoreError> {
    serde_json::from_value(raw.clone().into_flat()).map_err(|e| {
        CoreError::Decode(format!("{} {}: {e}", T::COLLECTION.entity(), raw.id))
    })
}
