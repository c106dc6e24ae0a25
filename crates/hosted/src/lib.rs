//! Adapter for a hosted backend-as-a-service.
//!
//! Speaks the PostgREST dialect for documents, the GoTrue dialect for
//! password auth, the storage API for objects, and Phoenix-framed realtime
//! channels for change notifications:
//!
//! - [`api`]: shared HTTP plumbing and error handling.
//! - [`auth`]: [`HostedAuth`], sign-in/out and access-token refresh.
//! - [`rest`]: query-string translation of collection queries.
//! - [`storage`]: [`HostedObjectStore`].
//! - [`realtime`]: channel join, heartbeats and change events.
//! - [`store`]: [`HostedDocumentStore`], live queries on top of the above.

pub mod api;
pub mod auth;
pub mod realtime;
pub mod rest;
pub mod storage;
pub mod store;
pub mod tokens;

use std::sync::Arc;

pub use api::{HostedApi, HostedError};
pub use auth::HostedAuth;
pub use storage::HostedObjectStore;
pub use store::HostedDocumentStore;
pub use tokens::{AuthTokens, TokenCell};

/// Connection settings for one hosted project.
#[derive(Debug, Clone)]
pub struct HostedConfig {
    /// Project base URL, e.g. `https://xyz.example.co`.
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
    /// Bucket holding note images. Must be public.
    pub bucket: String,
}

impl HostedConfig {
    pub fn new(url: &str, anon_key: &str, bucket: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            bucket: bucket.to_string(),
        }
    }

    /// Realtime WebSocket endpoint derived from the project URL.
    pub fn realtime_url(&self) -> String {
        let base = if let Some(rest) = self.url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.url.clone()
        };
        format!("{base}/realtime/v1/websocket?apikey={}&vsn=1.0.0", self.anon_key)
    }
}

/// All three capabilities of one hosted project, sharing one HTTP client
/// and one token cell.
pub struct HostedBackend {
    pub auth: Arc<HostedAuth>,
    pub store: Arc<HostedDocumentStore>,
    pub objects: Arc<HostedObjectStore>,
}

impl HostedBackend {
    pub fn new(config: HostedConfig) -> Self {
        let api = HostedApi::new(config, TokenCell::new());
        Self {
            auth: Arc::new(HostedAuth::new(api.clone())),
            store: Arc::new(HostedDocumentStore::new(api.clone())),
            objects: Arc::new(HostedObjectStore::new(api)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realtime_url_switches_scheme() {
        let config = HostedConfig::new("https://abc.example.co/", "key", "b");
        assert_eq!(
            config.realtime_url(),
            "wss://abc.example.co/realtime/v1/websocket?apikey=key&vsn=1.0.0"
        );

        let local = HostedConfig::new("http://localhost:54321", "k", "b");
        assert!(local.realtime_url().starts_with("ws://localhost:54321/realtime/"));
    }
}
