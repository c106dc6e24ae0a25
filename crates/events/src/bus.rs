//! In-process change bus backed by a `tokio::sync::broadcast` channel.
//!
//! Backends publish one [`ChangeEvent`] per committed write. Subscriptions
//! use them only as a trigger to re-read their query, so a dropped or
//! lagged event never leaves a view stale for longer than the next one.

use chrono::Utc;
use notesync_core::document::Collection;
use notesync_core::types::{DocId, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    /// Map a SQL trigger operation (`INSERT`, `UPDATE`, `DELETE`).
    pub fn from_sql_op(op: &str) -> Option<Self> {
        match op {
            "INSERT" => Some(Self::Created),
            "UPDATE" => Some(Self::Updated),
            "DELETE" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// A committed write to one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub doc_id: DocId,
    pub kind: ChangeKind,
    pub timestamp: Timestamp,
}

impl ChangeEvent {
    pub fn new(collection: Collection, doc_id: impl Into<DocId>, kind: ChangeKind) -> Self {
        Self {
            collection,
            doc_id: doc_id.into(),
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out of change events.
///
/// Designed to be shared via `Arc<ChangeBus>` between a backend and the
/// feeds it hands out.
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeBus {
    /// When the buffer is full the oldest events are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently when nobody
    /// listens.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
