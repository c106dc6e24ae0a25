//! Phoenix channel frames and the payloads the realtime service sends.
//!
//! Every frame has the shape
//! `{"topic": ..., "event": ..., "payload": {...}, "ref": ...}`. The
//! `event` decides how the payload is read.

use notesync_core::document::Collection;
use notesync_core::query::CollectionQuery;
use notesync_events::{ChangeEvent, ChangeKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Topic for connection-level heartbeats.
pub const PHOENIX_TOPIC: &str = "phoenix";

/// A raw frame, as sent and received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixFrame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
}

impl PhoenixFrame {
    pub fn new(topic: &str, event: &str, payload: Value, msg_ref: Option<String>) -> Self {
        Self {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
            msg_ref,
        }
    }

    pub fn to_text(&self) -> String {
        // A frame of strings and a JSON value always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Outgoing frames
// ---------------------------------------------------------------------------

/// Join `topic`, asking for row changes that may affect `query`.
///
/// Only the first equality filter is forwarded; the service accepts one
/// filter per subscription and a wider event set only costs a re-read.
pub fn join_frame(topic: &str, query: &CollectionQuery, access_token: &str, msg_ref: String) -> PhoenixFrame {
    let mut change = json!({
        "event": "*",
        "schema": "public",
        "table": query.collection.name(),
    });
    if let Some(filter) = query.filters.first() {
        let value = match &filter.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        change["filter"] = Value::String(format!("{}=eq.{value}", filter.field));
    }

    PhoenixFrame::new(
        topic,
        "phx_join",
        json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [change],
            },
            "access_token": access_token,
        }),
        Some(msg_ref),
    )
}

pub fn heartbeat_frame(msg_ref: String) -> PhoenixFrame {
    PhoenixFrame::new(PHOENIX_TOPIC, "heartbeat", json!({}), Some(msg_ref))
}

pub fn leave_frame(topic: &str, msg_ref: String) -> PhoenixFrame {
    PhoenixFrame::new(topic, "phx_leave", json!({}), Some(msg_ref))
}

pub fn access_token_frame(topic: &str, access_token: &str, msg_ref: String) -> PhoenixFrame {
    PhoenixFrame::new(
        topic,
        "access_token",
        json!({ "access_token": access_token }),
        Some(msg_ref),
    )
}

// ---------------------------------------------------------------------------
// Incoming messages
// ---------------------------------------------------------------------------

/// Typed view of an incoming frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    /// Answer to a frame we sent, matched by `msg_ref`.
    Reply {
        msg_ref: Option<String>,
        payload: ReplyPayload,
    },
    /// A row of a subscribed table changed.
    PostgresChanges(ChangeData),
    /// Service notice, e.g. subscription status.
    System(SystemPayload),
    /// The channel crashed server-side.
    Error,
    /// The channel was closed server-side.
    Close,
    /// Presence or broadcast traffic, irrelevant here.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplyPayload {
    pub status: String,
    #[serde(default)]
    pub response: Value,
}

impl ReplyPayload {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SystemPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct PostgresChangesPayload {
    data: ChangeData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeData {
    pub table: String,
    /// `INSERT`, `UPDATE` or `DELETE`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub record: Value,
    #[serde(default)]
    pub old_record: Value,
}

impl ChangeData {
    /// Convert to a bus event. Unknown tables or kinds yield `None`.
    pub fn to_event(&self) -> Option<ChangeEvent> {
        let collection = Collection::from_name(&self.table)?;
        let kind = ChangeKind::from_sql_op(&self.kind)?;
        let id = [&self.record, &self.old_record]
            .iter()
            .find_map(|row| row.get("id")?.as_str())
            .unwrap_or_default()
            .to_string();
        Some(ChangeEvent::new(collection, id, kind))
    }
}

/// Parse a text frame into a [`PhoenixFrame`] and its typed message.
pub fn parse_message(text: &str) -> Result<(PhoenixFrame, ChannelMessage), serde_json::Error> {
    let frame: PhoenixFrame = serde_json::from_str(text)?;
    let message = match frame.event.as_str() {
        "phx_reply" => ChannelMessage::Reply {
            msg_ref: frame.msg_ref.clone(),
            payload: serde_json::from_value(frame.payload.clone())?,
        },
        "postgres_changes" => {
            let payload: PostgresChangesPayload = serde_json::from_value(frame.payload.clone())?;
            ChannelMessage::PostgresChanges(payload.data)
        }
        "system" => ChannelMessage::System(serde_json::from_value(frame.payload.clone())?),
        "phx_error" => ChannelMessage::Error,
        "phx_close" => ChannelMessage::Close,
        other => ChannelMessage::Other(other.to_string()),
    };
    Ok((frame, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_join_reply() {
        let text = r#"{"topic":"realtime:t","event":"phx_reply","payload":{"status":"ok","response":{"postgres_changes":[{"id":1}]}},"ref":"1"}"#;
        let (frame, message) = parse_message(text).unwrap();
        assert_eq!(frame.topic, "realtime:t");
        match message {
            ChannelMessage::Reply { msg_ref, payload } => {
                assert_eq!(msg_ref.as_deref(), Some("1"));
                assert!(payload.is_ok());
            }
            other => panic!("Expected Reply, got {other:?}"),
        }
    }

    #[test]
    fn parse_postgres_change_into_bus_event() {
        let text = r#"{"topic":"realtime:t","event":"postgres_changes","payload":{"ids":[7],"data":{"schema":"public","table":"notes","type":"UPDATE","commit_timestamp":"2024-06-01T00:00:00Z","record":{"id":"n1","title":"x"},"old_record":{"id":"n1"}}},"ref":null}"#;
        let (_, message) = parse_message(text).unwrap();
        let ChannelMessage::PostgresChanges(data) = message else {
            panic!("Expected PostgresChanges");
        };
        let event = data.to_event().unwrap();
        assert_eq!(event.collection, Collection::Notes);
        assert_eq!(event.doc_id, "n1");
        assert_eq!(event.kind, ChangeKind::Updated);
    }

    #[test]
    fn delete_takes_id_from_old_record() {
        let data = ChangeData {
            table: "comments".into(),
            kind: "DELETE".into(),
            record: Value::Null,
            old_record: json!({"id": "c9"}),
        };
        assert_eq!(data.to_event().unwrap().doc_id, "c9");
    }

    #[test]
    fn unknown_events_are_other_and_garbage_fails() {
        let (_, message) =
            parse_message(r#"{"topic":"t","event":"presence_state","payload":{}}"#).unwrap();
        assert_eq!(message, ChannelMessage::Other("presence_state".into()));
        assert!(parse_message("not json").is_err());
    }

    #[test]
    fn join_forwards_first_filter_and_token() {
        let frame = join_frame(
            "realtime:x",
            &CollectionQuery::notes_in_folder("f1"),
            "tok",
            "1".into(),
        );
        assert_eq!(frame.event, "phx_join");
        let change = &frame.payload["config"]["postgres_changes"][0];
        assert_eq!(change["table"], "notes");
        assert_eq!(change["filter"], "folder_id=eq.f1");
        assert_eq!(frame.payload["access_token"], "tok");
    }

    #[test]
    fn heartbeat_uses_phoenix_topic() {
        let text = heartbeat_frame("3".into()).to_text();
        let parsed: PhoenixFrame = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.topic, PHOENIX_TOPIC);
        assert_eq!(parsed.event, "heartbeat");
        assert_eq!(parsed.msg_ref.as_deref(), Some("3"));
    }
}
