//! Object storage in one public bucket.

use async_trait::async_trait;
use notesync_core::backend::ObjectStore;
use notesync_core::error::CoreError;
use reqwest::Method;

use crate::api::{HostedApi, HostedError};

pub struct HostedObjectStore {
    api: HostedApi,
}

impl HostedObjectStore {
    pub fn new(api: HostedApi) -> Self {
        Self { api }
    }

    fn object_path(&self, key: &str) -> String {
        format!("/storage/v1/object/{}/{key}", self.api.config().bucket)
    }

    /// Public URL of an object. Objects in a public bucket need no token.
    pub fn public_url(&self, key: &str) -> String {
        let config = self.api.config();
        format!("{}/storage/v1/object/public/{}/{key}", config.url, config.bucket)
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), HostedError> {
        let response = self
            .api
            .request(Method::POST, &self.object_path(key))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        HostedApi::check_status(response).await
    }
}

#[async_trait]
impl ObjectStore for HostedObjectStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), CoreError> {
        let size = bytes.len();
        self.put(key, bytes, content_type)
            .await
            .map_err(HostedError::into_write)?;
        tracing::debug!(key, size, content_type, "Object uploaded");
        Ok(())
    }

    async fn download_url(&self, key: &str) -> Result<String, CoreError> {
        if key.is_empty() {
            return Err(CoreError::Validation("Empty object key".into()));
        }
        Ok(self.public_url(key))
    }
}
