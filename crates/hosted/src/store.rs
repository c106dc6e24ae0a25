//! Live document store on the hosted service.
//!
//! Each subscription joins its own realtime channel. Change frames land on
//! a private [`ChangeBus`] and [`requery_feed`] turns them into full
//! snapshots by re-reading the query over REST.

use async_trait::async_trait;
use futures::StreamExt;
use notesync_core::backend::{DocumentStore, SnapshotStream};
use notesync_core::document::{Collection, RawDocument};
use notesync_core::error::CoreError;
use notesync_core::query::CollectionQuery;
use notesync_core::types::{DocId, Fields};
use notesync_events::{requery_feed, ChangeBus};
use tokio_util::sync::CancellationToken;

use crate::api::{HostedApi, HostedError};
use crate::realtime::RealtimeChannel;
use crate::rest;

pub struct HostedDocumentStore {
    api: HostedApi,
}

impl HostedDocumentStore {
    pub fn new(api: HostedApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DocumentStore for HostedDocumentStore {
    async fn subscribe(&self, query: &CollectionQuery) -> Result<SnapshotStream, CoreError> {
        // Join before the first read so no change is missed.
        let channel = RealtimeChannel::join(&self.api, query)
            .await
            .map_err(HostedError::into_connection)?;
        let bus = ChangeBus::default();
        let changes = bus.subscribe();
        let initial = rest::select(&self.api, query)
            .await
            .map_err(HostedError::into_connection)?;

        let cancel = CancellationToken::new();
        tokio::spawn(channel.run(self.api.clone(), bus, cancel.clone()));

        let api = self.api.clone();
        let feed = requery_feed(changes, query.clone(), initial, move |q| {
            let api = api.clone();
            async move {
                rest::select(&api, &q)
                    .await
                    .map_err(HostedError::into_connection)
            }
        });

        // Dropping the stream leaves the channel.
        let guard = cancel.drop_guard();
        Ok(feed
            .map(move |snapshot| {
                let _keep = &guard;
                snapshot
            })
            .boxed())
    }

    async fn query(&self, query: &CollectionQuery) -> Result<Vec<RawDocument>, CoreError> {
        rest::select(&self.api, query)
            .await
            .map_err(HostedError::into_connection)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<RawDocument>, CoreError> {
        rest::get(&self.api, collection, id)
            .await
            .map_err(HostedError::into_connection)
    }

    async fn create(&self, collection: Collection, fields: Fields) -> Result<DocId, CoreError> {
        let id = rest::insert(&self.api, collection, fields)
            .await
            .map_err(HostedError::into_write)?;
        tracing::debug!(%collection, doc_id = %id, "Document inserted");
        Ok(id)
    }

    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<(), CoreError> {
        rest::update(&self.api, collection, id, fields)
            .await
            .map_err(HostedError::into_write)?;
        tracing::debug!(%collection, doc_id = %id, "Document updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{HostedConfig, TokenCell};

    fn unreachable_store() -> HostedDocumentStore {
        // Port 9 (discard) is closed on test hosts.
        let api = HostedApi::new(HostedConfig::new("http://127.0.0.1:9", "anon", "b"), TokenCell::new());
        HostedDocumentStore::new(api)
    }

    #[tokio::test]
    async fn unreachable_service_fails_subscribe_with_connection_error() {
        let store = unreachable_store();
        let result = store.subscribe(&CollectionQuery::public_feed()).await;
        assert!(matches!(result, Err(CoreError::Connection(_))));
    }

    #[tokio::test]
    async fn unreachable_service_fails_writes_with_write_error() {
        let store = unreachable_store();
        assert_matches!(
            store.create(Collection::Folders, Fields::new()).await,
            Err(CoreError::Write(_))
        );
        assert_matches!(
            store.update(Collection::Notes, "n1", Fields::new()).await,
            Err(CoreError::Write(_))
        );
    }
}
