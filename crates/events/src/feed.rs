//! Full-snapshot subscriptions on top of a change feed.
//!
//! Every change-feed backend answers `subscribe` the same way: read the
//! query once, then re-read it whenever a change to the same collection
//! arrives and push the complete result. Nothing is merged locally.

use std::future::Future;

use futures::StreamExt;
use notesync_core::backend::SnapshotStream;
use notesync_core::document::RawDocument;
use notesync_core::error::CoreError;
use notesync_core::query::CollectionQuery;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;

use crate::bus::ChangeEvent;

/// Snapshots buffered per subscription before the feed task waits.
const FEED_BUFFER: usize = 16;

/// Build a live snapshot stream.
///
/// `changes` must be subscribed *before* `initial` was read so that no
/// commit falls between the two. The spawned task ends when the stream is
/// dropped or the change bus closes.
pub fn requery_feed<F, Fut>(
    mut changes: broadcast::Receiver<ChangeEvent>,
    query: CollectionQuery,
    initial: Vec<RawDocument>,
    fetch: F,
) -> SnapshotStream
where
    F: Fn(CollectionQuery) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<RawDocument>, CoreError>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(FEED_BUFFER);

    tokio::spawn(async move {
        if tx.send(Ok(initial)).await.is_err() {
            return;
        }

        loop {
            let event = tokio::select! {
                _ = tx.closed() => break,
                event = changes.recv() => event,
            };

            match event {
                Ok(event) if event.collection != query.collection => continue,
                Ok(event) => {
                    tracing::trace!(
                        collection = %event.collection,
                        doc_id = %event.doc_id,
                        "Change observed, re-reading query"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(
                        collection = %query.collection,
                        skipped,
                        "Feed lagged, re-reading query"
                    );
                }
                Err(RecvError::Closed) => {
                    tracing::debug!(collection = %query.collection, "Change bus closed, ending feed");
                    break;
                }
            }

            // Coalesce a burst of commits into one re-read.
            loop {
                match changes.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }

            let result = fetch(query.clone()).await;
            if let Err(e) = &result {
                tracing::warn!(collection = %query.collection, error = %e, "Feed re-read failed");
            }
            if tx.send(result).await.is_err() {
                break;
            }
        }
    });

    ReceiverStream::new(rx).boxed()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use notesync_core::document::Collection;
    use serde_json::json;

    use super::*;
    use crate::bus::{ChangeBus, ChangeKind};

    fn doc(id: &str) -> RawDocument {
        RawDocument::from_flat(json!({ "id": id })).unwrap()
    }

    #[tokio::test]
    async fn first_item_is_the_initial_snapshot() {
        let bus = ChangeBus::default();
        let mut stream = requery_feed(
            bus.subscribe(),
            CollectionQuery::new(Collection::Notes),
            vec![doc("a")],
            |_| async { Ok(vec![]) },
        );

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, vec![doc("a")]);
    }

    #[tokio::test]
    async fn changes_to_other_collections_are_ignored() {
        let bus = ChangeBus::default();
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fetches);
        let mut stream = requery_feed(
            bus.subscribe(),
            CollectionQuery::new(Collection::Notes),
            vec![],
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(vec![doc("fresh")]) }
            },
        );
        stream.next().await.unwrap().unwrap();

        bus.publish(ChangeEvent::new(Collection::Comments, "c1", ChangeKind::Created));
        bus.publish(ChangeEvent::new(Collection::Notes, "n1", ChangeKind::Created));

        let next = stream.next().await.unwrap().unwrap();
        assert_eq!(next, vec![doc("fresh")]);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropping_the_stream_ends_the_task() {
        let bus = ChangeBus::default();
        let stream = requery_feed(
            bus.subscribe(),
            CollectionQuery::new(Collection::Folders),
            vec![],
            |_| async { Ok(vec![]) },
        );
        assert_eq!(bus.subscriber_count(), 1);

        drop(stream);

        // The task notices `tx.closed()` and drops its receiver.
        tokio::time::timeout(Duration::from_secs(1), async {
            while bus.subscriber_count() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("feed task should release its bus subscription");
    }

    #[tokio::test]
    async fn fetch_errors_are_delivered_and_the_feed_continues() {
        let bus = ChangeBus::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut stream = requery_feed(
            bus.subscribe(),
            CollectionQuery::new(Collection::Notes),
            vec![],
            move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(CoreError::Connection("down".into()))
                    } else {
                        Ok(vec![doc("back")])
                    }
                }
            },
        );
        stream.next().await.unwrap().unwrap();

        bus.publish(ChangeEvent::new(Collection::Notes, "n1", ChangeKind::Updated));
        assert!(stream.next().await.unwrap().is_err());

        bus.publish(ChangeEvent::new(Collection::Notes, "n1", ChangeKind::Updated));
        assert_eq!(stream.next().await.unwrap().unwrap(), vec![doc("back")]);
    }
}
