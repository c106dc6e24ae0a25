/// Document ids are opaque strings assigned by the store on create.
pub type DocId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// The field map of a stored document, without its id.
pub type Fields = serde_json::Map<String, serde_json::Value>;
