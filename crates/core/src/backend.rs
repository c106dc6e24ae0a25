//! Capability interfaces every backend implements.
//!
//! The client never talks to a concrete SDK. It holds trait objects for a
//! document store with live queries, an object store, and an auth
//! provider, so a hosted service, a self-hosted database with a change
//! feed, or the in-memory store can be swapped without touching views.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::watch;

use crate::document::{Collection, RawDocument};
use crate::error::CoreError;
use crate::models::Identity;
use crate::query::CollectionQuery;
use crate::types::{DocId, Fields};

/// Stream of full result sets for one live query.
///
/// The first item is the initial snapshot. Every later item is the complete
/// current matching set, never a diff. Dropping the stream releases the
/// subscription.
pub type SnapshotStream = BoxStream<'static, Result<Vec<RawDocument>, CoreError>>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a live query.
    ///
    /// Fails with [`CoreError::Connection`] when the subscription cannot be
    /// established. No retry happens here.
    async fn subscribe(&self, query: &CollectionQuery) -> Result<SnapshotStream, CoreError>;

    /// One-shot evaluation of a query.
    async fn query(&self, query: &CollectionQuery) -> Result<Vec<RawDocument>, CoreError>;

    /// Point read of a single document.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<RawDocument>, CoreError>;

    /// Create a document and return its store-assigned id.
    async fn create(&self, collection: Collection, fields: Fields) -> Result<DocId, CoreError>;

    /// Overwrite the given fields of an existing document.
    ///
    /// Fails with [`CoreError::Write`] when the document does not exist.
    async fn update(&self, collection: Collection, id: &str, fields: Fields)
        -> Result<(), CoreError>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), CoreError>;

    /// A durable download reference for `key`.
    async fn download_url(&self, key: &str) -> Result<String, CoreError>;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, CoreError>;

    async fn sign_out(&self) -> Result<(), CoreError>;

    /// Identity-change notifications. `None` means signed out.
    fn identity_changes(&self) -> watch::Receiver<Option<Identity>>;
}
