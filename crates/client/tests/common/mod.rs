use std::sync::Arc;
use std::time::Duration;

use notesync_client::memory::{MemoryAuth, MemoryObjectStore, MemoryStore};
use notesync_client::view_model::{CollectionViewModel, Snapshot};
use notesync_client::NoteClient;
use notesync_core::document::Document;
use notesync_core::models::Identity;

pub const FILES_URL: &str = "http://files.test";

/// An in-memory backend plus a client wired to it.
pub struct Harness {
    pub store: MemoryStore,
    pub objects: Arc<MemoryObjectStore>,
    pub auth: Arc<MemoryAuth>,
    pub client: NoteClient,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let objects = Arc::new(MemoryObjectStore::new(FILES_URL));
        let auth = Arc::new(MemoryAuth::new());
        let client = NoteClient::new(
            Arc::new(store.clone()),
            Arc::clone(&objects) as _,
            Arc::clone(&auth) as _,
        );
        Self {
            store,
            objects,
            auth,
            client,
        }
    }

    /// Register an account and sign the client in with it.
    pub async fn signed_in(email: &str, display_name: Option<&str>) -> (Self, Identity) {
        let harness = Self::new();
        harness.auth.register(email, "password", display_name).await;
        let identity = harness
            .client
            .session
            .sign_in(email, "password")
            .await
            .expect("sign-in should succeed");
        (harness, identity)
    }
}

/// Wait until the view-model's snapshot satisfies `pred`.
pub async fn settle<T: Document>(
    vm: &mut CollectionViewModel<T>,
    pred: impl Fn(&Snapshot<T>) -> bool,
) -> Arc<Snapshot<T>> {
    tokio::time::timeout(Duration::from_secs(2), async {
        let current = vm.snapshot();
        if pred(&current) {
            return current;
        }
        loop {
            let next = vm.next_change().await.expect("view-model closed early");
            if pred(&next) {
                return next;
            }
        }
    })
    .await
    .expect("snapshot did not settle in time")
}

/// A minimal PNG: signature plus an IHDR header.
pub fn png_bytes() -> Vec<u8> {
    vec![
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R',
    ]
}
