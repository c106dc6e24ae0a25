//! Bridge from Postgres `LISTEN/NOTIFY` to the in-process change bus.

use std::sync::Arc;
use std::time::Duration;

use notesync_core::document::Collection;
use notesync_events::{ChangeBus, ChangeEvent, ChangeKind};
use serde::Deserialize;
use sqlx::postgres::PgListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::DbPool;

/// Channel the notify trigger publishes on.
pub const CHANNEL: &str = "document_changes";

/// Doc id used for the catch-up events published after a reconnect.
pub const RESYNC_DOC_ID: &str = "*";

/// Delay before retrying a failed `LISTEN` connection.
const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct Notification {
    table: String,
    id: String,
    op: String,
}

/// Decode one trigger payload. Unknown tables or operations yield `None`.
pub fn parse_notification(payload: &str) -> Option<ChangeEvent> {
    let n: Notification = serde_json::from_str(payload).ok()?;
    let collection = Collection::from_name(&n.table)?;
    let kind = ChangeKind::from_sql_op(&n.op)?;
    Some(ChangeEvent::new(collection, n.id, kind))
}

/// Spawn the listener task. It runs until `cancel` fires.
///
/// Notifications sent while the connection was down are lost, so after
/// every reconnect one catch-up event per collection is published and all
/// live queries re-read.
pub fn spawn_change_listener(
    pool: DbPool,
    bus: Arc<ChangeBus>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(channel = CHANNEL, "Change listener started");
        loop {
            let listener = tokio::select! {
                _ = cancel.cancelled() => break,
                listener = connect(&pool) => listener,
            };

            match listener {
                Ok(listener) => {
                    publish_resync(&bus);
                    if run(listener, &bus, &cancel).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to LISTEN for document changes");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(RETRY_DELAY) => {}
            }
        }
        tracing::info!("Change listener stopped");
    })
}

async fn connect(pool: &DbPool) -> Result<PgListener, sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANNEL).await?;
    Ok(listener)
}

/// Forward notifications until cancelled (returns `true`) or the
/// connection fails (returns `false`).
async fn run(mut listener: PgListener, bus: &ChangeBus, cancel: &CancellationToken) -> bool {
    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => return true,
            received = listener.try_recv() => received,
        };

        match received {
            Ok(Some(notification)) => match parse_notification(notification.payload()) {
                Some(event) => {
                    tracing::trace!(
                        collection = %event.collection,
                        doc_id = %event.doc_id,
                        "Document change notified"
                    );
                    bus.publish(event);
                }
                None => {
                    tracing::warn!(payload = notification.payload(), "Unrecognised change notification");
                }
            },
            // The connection dropped; the next call reconnects.
            Ok(None) => {
                tracing::warn!("Change listener connection lost, reconnecting");
                publish_resync(bus);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Change listener failed");
                return false;
            }
        }
    }
}

fn publish_resync(bus: &ChangeBus) {
    for collection in Collection::ALL {
        bus.publish(ChangeEvent::new(collection, RESYNC_DOC_ID, ChangeKind::Updated));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trigger_payload() {
        let event = parse_notification(r#"{"table":"notes","id":"n1","op":"UPDATE"}"#).unwrap();
        assert_eq!(event.collection, Collection::Notes);
        assert_eq!(event.doc_id, "n1");
        assert_eq!(event.kind, ChangeKind::Updated);
    }

    #[test]
    fn ignores_unknown_tables_and_garbage() {
        assert!(parse_notification(r#"{"table":"users","id":"u1","op":"INSERT"}"#).is_none());
        assert!(parse_notification(r#"{"table":"notes","id":"n1","op":"TRUNCATE"}"#).is_none());
        assert!(parse_notification("not json").is_none());
    }
}
