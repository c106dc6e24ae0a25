//! Live, full-snapshot view-models over a [`DocumentStore`] subscription.
//!
//! A [`CollectionViewModel`] owns one subscription and the latest decoded
//! snapshot of its query. Every remote change replaces the snapshot as a
//! whole; nothing is merged. [`close`](CollectionViewModel::close) (or
//! dropping the view-model) releases the subscription, after which no
//! further snapshot is published.

use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use notesync_core::backend::{DocumentStore, SnapshotStream};
use notesync_core::document::{decode, Document, RawDocument};
use notesync_core::error::CoreError;
use notesync_core::query::CollectionQuery;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One delivered result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    /// 0 for the initial snapshot, incremented on every re-delivery.
    pub version: u64,
}

impl<T: Document> Snapshot<T> {
    /// Decode raw documents, skipping (and logging) malformed ones.
    fn decode(docs: Vec<RawDocument>, version: u64) -> Self {
        let items = docs
            .iter()
            .filter_map(|raw| match decode::<T>(raw) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(
                        collection = %T::COLLECTION,
                        doc_id = %raw.id,
                        error = %e,
                        "Skipping malformed document",
                    );
                    None
                }
            })
            .collect();
        Self { items, version }
    }
}

type Publisher<T> = Arc<Mutex<Option<watch::Sender<Arc<Snapshot<T>>>>>>;

// ---------------------------------------------------------------------------
// CollectionViewModel
// ---------------------------------------------------------------------------

pub struct CollectionViewModel<T: Document> {
    query: CollectionQuery,
    state: watch::Receiver<Arc<Snapshot<T>>>,
    publisher: Publisher<T>,
    cancel: CancellationToken,
}

impl<T: Document> CollectionViewModel<T> {
    /// Subscribe to `query` and wait for the initial snapshot.
    ///
    /// Any failure before the initial snapshot arrives is reported as
    /// [`CoreError::Connection`]. There is no retry.
    pub async fn open(store: &dyn DocumentStore, query: CollectionQuery) -> Result<Self, CoreError> {
        if query.collection != T::COLLECTION {
            return Err(CoreError::Validation(format!(
                "Query targets {} but the view-model holds {}",
                query.collection,
                T::COLLECTION
            )));
        }

        let mut stream = store.subscribe(&query).await.map_err(connection_error)?;
        let initial = match stream.next().await {
            Some(Ok(docs)) => docs,
            Some(Err(e)) => return Err(connection_error(e)),
            None => {
                return Err(CoreError::Connection(
                    "Subscription ended before the initial snapshot".into(),
                ))
            }
        };

        let (tx, rx) = watch::channel(Arc::new(Snapshot::decode(initial, 0)));
        let publisher: Publisher<T> = Arc::new(Mutex::new(Some(tx)));
        let cancel = CancellationToken::new();

        tracing::debug!(
            collection = %query.collection,
            filters = query.filters.len(),
            "View-model opened",
        );

        tokio::spawn(forward_snapshots(
            stream,
            Arc::clone(&publisher),
            cancel.clone(),
        ));

        Ok(Self {
            query,
            state: rx,
            publisher,
            cancel,
        })
    }

    pub fn query(&self) -> &CollectionQuery {
        &self.query
    }

    /// The latest snapshot. Still readable after close.
    pub fn snapshot(&self) -> Arc<Snapshot<T>> {
        Arc::clone(&self.state.borrow())
    }

    pub fn items(&self) -> Vec<T> {
        self.snapshot().items.clone()
    }

    /// A receiver for presentation code. It reports closed once the
    /// view-model is closed.
    pub fn changes(&self) -> watch::Receiver<Arc<Snapshot<T>>> {
        self.state.clone()
    }

    /// Wait for the next snapshot. `None` once the view-model is closed.
    pub async fn next_change(&mut self) -> Option<Arc<Snapshot<T>>> {
        if self.is_closed() {
            return None;
        }
        self.state.changed().await.ok()?;
        if self.is_closed() {
            return None;
        }
        Some(Arc::clone(&self.state.borrow_and_update()))
    }

    /// Release the subscription. Idempotent.
    ///
    /// When this returns no snapshot will be published anymore, even if
    /// the backend pushes one concurrently.
    pub fn close(&self) {
        let sender = self
            .publisher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            self.cancel.cancel();
            tracing::debug!(collection = %self.query.collection, "View-model closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.publisher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl<T: Document> Drop for CollectionViewModel<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Pump backend snapshots into the view-model until closed.
///
/// The stream is dropped when this returns, which releases the backend
/// subscription.
async fn forward_snapshots<T: Document>(
    mut stream: SnapshotStream,
    publisher: Publisher<T>,
    cancel: CancellationToken,
) {
    let mut version = 0;
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = stream.next() => item,
        };

        match item {
            Some(Ok(docs)) => {
                version += 1;
                let snapshot = Arc::new(Snapshot::decode(docs, version));
                let guard = publisher.lock().unwrap_or_else(PoisonError::into_inner);
                match guard.as_ref() {
                    Some(tx) => {
                        tx.send_replace(snapshot);
                    }
                    None => break,
                }
            }
            Some(Err(e)) => {
                tracing::warn!(
                    collection = %T::COLLECTION,
                    error = %e,
                    "Snapshot delivery failed, keeping the last snapshot",
                );
            }
            None => {
                tracing::debug!(collection = %T::COLLECTION, "Subscription ended by backend");
                break;
            }
        }
    }
}

fn connection_error(e: CoreError) -> CoreError {
    match e {
        CoreError::Connection(_) => e,
        other => CoreError::Connection(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// DocumentViewModel
// ---------------------------------------------------------------------------

/// A live view of a single document, absent while it does not exist.
pub struct DocumentViewModel<T: Document> {
    inner: CollectionViewModel<T>,
}

impl<T: Document> DocumentViewModel<T> {
    pub async fn open(store: &dyn DocumentStore, id: &str) -> Result<Self, CoreError> {
        let query = CollectionQuery::by_id(T::COLLECTION, id);
        Ok(Self {
            inner: CollectionViewModel::open(store, query).await?,
        })
    }

    pub fn current(&self) -> Option<T> {
        self.inner.snapshot().items.first().cloned()
    }

    pub async fn next_change(&mut self) -> Option<Option<T>> {
        let snapshot = self.inner.next_change().await?;
        Some(snapshot.items.first().cloned())
    }

    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use notesync_core::document::Collection;
    use notesync_core::models::{Folder, Note};
    use serde_json::json;

    use super::*;
    use crate::memory::MemoryStore;

    fn folder_fields(user_id: &str, name: &str) -> notesync_core::types::Fields {
        let serde_json::Value::Object(map) = json!({
            "user_id": user_id,
            "name": name,
            "description": "",
        }) else {
            unreachable!()
        };
        map
    }

    async fn wait_for_release(store: &MemoryStore) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while store.subscriber_count() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("subscription should be released");
    }

    #[tokio::test]
    async fn initial_snapshot_is_available_after_open() {
        let store = MemoryStore::new();
        store
            .create(Collection::Folders, folder_fields("u1", "Recipes"))
            .await
            .unwrap();

        let vm = CollectionViewModel::<Folder>::open(&store, CollectionQuery::folders_of("u1"))
            .await
            .unwrap();
        let snapshot = vm.snapshot();
        assert_eq!(snapshot.version, 0);
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].name, "Recipes");
    }

    #[tokio::test]
    async fn changes_replace_the_snapshot() {
        let store = MemoryStore::new();
        let mut vm = CollectionViewModel::<Folder>::open(&store, CollectionQuery::folders_of("u1"))
            .await
            .unwrap();
        assert!(vm.items().is_empty());

        store
            .create(Collection::Folders, folder_fields("u1", "Work"))
            .await
            .unwrap();
        let snapshot = vm.next_change().await.unwrap();
        assert_eq!(snapshot.items.len(), 1);
        assert!(snapshot.version > 0);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_stops_delivery() {
        let store = MemoryStore::new();
        let mut vm = CollectionViewModel::<Folder>::open(&store, CollectionQuery::folders_of("u1"))
            .await
            .unwrap();

        vm.close();
        vm.close();
        assert!(vm.is_closed());
        wait_for_release(&store).await;

        store
            .create(Collection::Folders, folder_fields("u1", "Late"))
            .await
            .unwrap();
        assert!(vm.next_change().await.is_none());
        assert!(vm.items().is_empty());
    }

    #[tokio::test]
    async fn dropping_releases_the_subscription() {
        let store = MemoryStore::new();
        let vm = CollectionViewModel::<Folder>::open(&store, CollectionQuery::folders_of("u1"))
            .await
            .unwrap();
        assert_eq!(store.subscriber_count(), 1);

        drop(vm);
        wait_for_release(&store).await;
    }

    #[tokio::test]
    async fn open_fails_with_connection_error_when_offline() {
        let store = MemoryStore::new();
        store.set_offline(true);

        let result =
            CollectionViewModel::<Note>::open(&store, CollectionQuery::public_feed()).await;
        assert_matches!(result.err(), Some(CoreError::Connection(_)));
    }

    #[tokio::test]
    async fn query_for_another_collection_is_rejected() {
        let store = MemoryStore::new();
        let result =
            CollectionViewModel::<Folder>::open(&store, CollectionQuery::public_feed()).await;
        assert_matches!(result.err(), Some(CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn malformed_documents_are_skipped() {
        let store = MemoryStore::new();
        store
            .create(Collection::Folders, folder_fields("u1", "Good"))
            .await
            .unwrap();
        // Missing the required `name` field.
        let serde_json::Value::Object(broken) = json!({ "user_id": "u1" }) else {
            unreachable!()
        };
        store.create(Collection::Folders, broken).await.unwrap();

        let vm = CollectionViewModel::<Folder>::open(&store, CollectionQuery::folders_of("u1"))
            .await
            .unwrap();
        let names: Vec<_> = vm.items().into_iter().map(|f| f.name).collect();
        assert_eq!(names, ["Good"]);
    }

    #[tokio::test]
    async fn failed_redelivery_keeps_last_snapshot() {
        let store = MemoryStore::new();
        store
            .create(Collection::Folders, folder_fields("u1", "Kept"))
            .await
            .unwrap();
        let vm = CollectionViewModel::<Folder>::open(&store, CollectionQuery::folders_of("u1"))
            .await
            .unwrap();

        store.set_offline(true);
        store.touch(Collection::Folders, "any");
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(vm.snapshot().version, 0);
        assert_eq!(vm.items()[0].name, "Kept");
    }

    #[tokio::test]
    async fn document_view_model_tracks_one_document() {
        let store = MemoryStore::new();
        let id = store
            .create(Collection::Folders, folder_fields("u1", "Old"))
            .await
            .unwrap();

        let mut vm = DocumentViewModel::<Folder>::open(&store, &id).await.unwrap();
        assert_eq!(vm.current().unwrap().name, "Old");

        let serde_json::Value::Object(patch) = json!({ "name": "New" }) else {
            unreachable!()
        };
        store.update(Collection::Folders, &id, patch).await.unwrap();

        let current = vm.next_change().await.unwrap().unwrap();
        assert_eq!(current.name, "New");
    }

    #[tokio::test]
    async fn document_view_model_is_empty_for_missing_document() {
        let store = MemoryStore::new();
        let vm = DocumentViewModel::<Folder>::open(&store, "missing").await.unwrap();
        assert!(vm.current().is_none());
    }
}
