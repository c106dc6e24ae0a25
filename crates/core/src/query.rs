//! Filtered, ordered collection queries.
//!
//! A [`CollectionQuery`] is what a view-model subscribes to. Backends that
//! cannot push queries to a server (the in-memory store) evaluate them
//! locally with [`CollectionQuery::apply`]; the others translate them.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Collection, RawDocument};

/// Well-known field names, shared by queries and mutations.
pub mod field {
    pub const ID: &str = "id";
    pub const USER_ID: &str = "user_id";
    pub const FOLDER_ID: &str = "folder_id";
    pub const NOTE_ID: &str = "note_id";
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const TITLE: &str = "title";
    pub const CONTENT: &str = "content";
    pub const IS_PUBLIC: &str = "is_public";
    pub const IMAGES: &str = "images";
    pub const USER_NAME: &str = "user_name";
    pub const TEXT: &str = "text";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
}

/// Number of notes shown in the profile's "recent notes" list.
pub const RECENT_NOTES_LIMIT: usize = 5;

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

/// Equality on a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionQuery {
    pub collection: Collection,
    /// Conjunction of equality filters.
    pub filters: Vec<FieldFilter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl CollectionQuery {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Order {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    // ---- canonical queries ----

    /// Public notes, newest first.
    pub fn public_feed() -> Self {
        Self::new(Collection::Notes)
            .where_eq(field::IS_PUBLIC, true)
            .order_by(field::CREATED_AT, Direction::Desc)
    }

    pub fn folders_of(user_id: &str) -> Self {
        Self::new(Collection::Folders).where_eq(field::USER_ID, user_id)
    }

    pub fn notes_in_folder(folder_id: &str) -> Self {
        Self::new(Collection::Notes).where_eq(field::FOLDER_ID, folder_id)
    }

    /// Comments of one note, newest first.
    pub fn comments_of(note_id: &str) -> Self {
        Self::new(Collection::Comments)
            .where_eq(field::NOTE_ID, note_id)
            .order_by(field::CREATED_AT, Direction::Desc)
    }

    pub fn recent_notes_of(user_id: &str) -> Self {
        Self::new(Collection::Notes)
            .where_eq(field::USER_ID, user_id)
            .order_by(field::CREATED_AT, Direction::Desc)
            .limit(RECENT_NOTES_LIMIT)
    }

    /// A single document, as a live one-element query.
    pub fn by_id(collection: Collection, id: &str) -> Self {
        Self::new(collection).where_eq(field::ID, id).limit(1)
    }

    // ---- local evaluation ----

    /// Whether `doc` satisfies every filter.
    pub fn matches(&self, doc: &RawDocument) -> bool {
        self.filters.iter().all(|filter| {
            if filter.field == field::ID {
                filter.value.as_str() == Some(doc.id.as_str())
            } else {
                doc.fields.get(&filter.field) == Some(&filter.value)
            }
        })
    }

    /// Filter, order and truncate a set of documents.
    ///
    /// Sorting is stable: documents that compare equal keep input order.
    pub fn apply(&self, docs: impl IntoIterator<Item = RawDocument>) -> Vec<RawDocument> {
        let mut matched: Vec<RawDocument> = docs.into_iter().filter(|d| self.matches(d)).collect();

        if let Some(order) = &self.order {
            matched.sort_by(|a, b| {
                let ord = compare_values(a.fields.get(&order.field), b.fields.get(&order.field));
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

/// Total order over JSON field values used for sorting snapshots.
///
/// Missing and `null` sort first. RFC 3339 strings compare chronologically,
/// numbers numerically, booleans `false < true`, other strings
/// lexicographically. Values of different kinds compare by kind.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                chrono::DateTime::parse_from_rfc3339(x),
                chrono::DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(tx), Ok(ty)) => tx.cmp(&ty),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => kind_rank(x).cmp(&kind_rank(y)),
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
