//! In-memory backend: document store with live queries, object store and
//! password auth.
//!
//! Used by the `memory` backend mode of the web binary and by tests. The
//! document store evaluates queries locally and drives subscriptions
//! through the shared change-feed helper, so it honours the same
//! full-snapshot contract as the database-backed stores. Offline mode and
//! upload failures can be switched on to exercise error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use notesync_core::backend::{AuthProvider, DocumentStore, ObjectStore, SnapshotStream};
use notesync_core::document::{Collection, RawDocument};
use notesync_core::error::CoreError;
use notesync_core::models::Identity;
use notesync_core::query::CollectionQuery;
use notesync_core::types::{DocId, Fields};
use notesync_events::{requery_feed, ChangeBus, ChangeEvent, ChangeKind};
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreInner {
    /// Per collection, in creation order.
    docs: RwLock<HashMap<Collection, Vec<RawDocument>>>,
    bus: ChangeBus,
    offline: AtomicBool,
    writes: AtomicUsize,
}

impl StoreInner {
    fn ensure_online(&self) -> Result<(), String> {
        if self.offline.load(Ordering::SeqCst) {
            Err("memory store is offline".into())
        } else {
            Ok(())
        }
    }

    async fn evaluate(&self, query: &CollectionQuery) -> Result<Vec<RawDocument>, CoreError> {
        self.ensure_online().map_err(CoreError::Connection)?;
        let docs = self.docs.read().await;
        let all = docs.get(&query.collection).into_iter().flatten().cloned();
        Ok(query.apply(all))
    }
}

/// Cheap to clone; clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline, subscriptions and queries fail with
    /// [`CoreError::Connection`] and writes with [`CoreError::Write`].
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.bus.subscriber_count()
    }

    /// Number of successful creates and updates.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Announce a change without modifying anything.
    pub fn touch(&self, collection: Collection, id: &str) {
        self.inner
            .bus
            .publish(ChangeEvent::new(collection, id, ChangeKind::Updated));
    }

    /// Remove a document, as an out-of-band deletion would.
    pub async fn remove(&self, collection: Collection, id: &str) -> bool {
        let removed = {
            let mut docs = self.inner.docs.write().await;
            let list = docs.entry(collection).or_default();
            let before = list.len();
            list.retain(|doc| doc.id != id);
            list.len() != before
        };
        if removed {
            self.inner
                .bus
                .publish(ChangeEvent::new(collection, id, ChangeKind::Deleted));
        }
        removed
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn subscribe(&self, query: &CollectionQuery) -> Result<SnapshotStream, CoreError> {
        let changes = self.inner.bus.subscribe();
        let initial = self.inner.evaluate(query).await?;

        let inner = Arc::clone(&self.inner);
        Ok(requery_feed(changes, query.clone(), initial, move |q| {
            let inner = Arc::clone(&inner);
            async move { inner.evaluate(&q).await }
        }))
    }

    async fn query(&self, query: &CollectionQuery) -> Result<Vec<RawDocument>, CoreError> {
        self.inner.evaluate(query).await
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<RawDocument>, CoreError> {
        self.inner.ensure_online().map_err(CoreError::Connection)?;
        let docs = self.inner.docs.read().await;
        Ok(docs
            .get(&collection)
            .and_then(|list| list.iter().find(|doc| doc.id == id))
            .cloned())
    }

    async fn create(&self, collection: Collection, mut fields: Fields) -> Result<DocId, CoreError> {
        self.inner.ensure_online().map_err(CoreError::Write)?;
        fields.remove("id");
        let id = Uuid::now_v7().to_string();

        self.inner
            .docs
            .write()
            .await
            .entry(collection)
            .or_default()
            .push(RawDocument::new(id.clone(), fields));
        self.inner.writes.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(%collection, doc_id = %id, "Document created");
        self.inner
            .bus
            .publish(ChangeEvent::new(collection, id.clone(), ChangeKind::Created));
        Ok(id)
    }

    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<(), CoreError> {
        self.inner.ensure_online().map_err(CoreError::Write)?;
        {
            let mut docs = self.inner.docs.write().await;
            let existing = docs
                .get_mut(&collection)
                .and_then(|list| list.iter_mut().find(|doc| doc.id == id))
                .ok_or_else(|| {
                    CoreError::Write(format!("{} {id} does not exist", collection.entity()))
                })?;
            for (key, value) in fields {
                if key != "id" {
                    existing.fields.insert(key, value);
                }
            }
        }
        self.inner.writes.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(%collection, doc_id = %id, "Document updated");
        self.inner
            .bus
            .publish(ChangeEvent::new(collection, id, ChangeKind::Updated));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Object store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

pub struct MemoryObjectStore {
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
    reject_uploads: AtomicBool,
}

impl MemoryObjectStore {
    /// `base_url` prefixes every download reference.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
            reject_uploads: AtomicBool::new(false),
        }
    }

    pub fn set_reject_uploads(&self, reject: bool) {
        self.reject_uploads.store(reject, Ordering::SeqCst);
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), CoreError> {
        if self.reject_uploads.load(Ordering::SeqCst) {
            return Err(CoreError::Write(format!("Upload of {key} rejected")));
        }
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn download_url(&self, key: &str) -> Result<String, CoreError> {
        if !self.objects.read().await.contains_key(key) {
            return Err(CoreError::NotFound {
                entity: "Object",
                id: key.to_string(),
            });
        }
        Ok(format!("{}/{key}", self.base_url))
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

struct Account {
    password: String,
    identity: Identity,
}

pub struct MemoryAuth {
    accounts: RwLock<HashMap<String, Account>>,
    current: watch::Sender<Option<Identity>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            accounts: RwLock::new(HashMap::new()),
            current,
        }
    }

    /// Create (or replace) an account and return its identity.
    pub async fn register(&self, email: &str, password: &str, display_name: Option<&str>) -> Identity {
        let identity = Identity {
            uid: Uuid::now_v7().to_string(),
            email: email.to_string(),
            display_name: display_name.map(str::to_string),
        };
        self.accounts.write().await.insert(
            email.to_lowercase(),
            Account {
                password: password.to_string(),
                identity: identity.clone(),
            },
        );
        identity
    }

    /// Push an identity change as if it came from outside, e.g. an expired
    /// session.
    pub fn force_identity(&self, identity: Option<Identity>) {
        self.current.send_replace(identity);
    }
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, CoreError> {
        let identity = {
            let accounts = self.accounts.read().await;
            match accounts.get(&email.to_lowercase()) {
                Some(account) if account.password == password => account.identity.clone(),
                _ => return Err(CoreError::Auth("Invalid email or password".into())),
            }
        };
        tracing::info!(user_id = %identity.uid, "Signed in");
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), CoreError> {
        self.current.send_replace(None);
        Ok(())
    }

    fn identity_changes(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}
