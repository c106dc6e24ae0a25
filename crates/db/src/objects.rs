//! Object store on the local filesystem.
//!
//! Objects are written below a root directory under their key; download
//! references are the key appended to a public base URL that the web
//! server maps onto the same directory.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use notesync_core::backend::ObjectStore;
use notesync_core::error::CoreError;

pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path inside the root. Only plain relative
    /// components are accepted.
    fn path_for(&self, key: &str) -> Result<PathBuf, CoreError> {
        let relative = Path::new(key);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !plain {
            return Err(CoreError::Validation(format!("Invalid object key '{key}'")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), CoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::Write(format!("Failed to create {}: {e}", parent.display())))?;
        }
        let size = bytes.len();
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| CoreError::Write(format!("Failed to write {key}: {e}")))?;

        tracing::debug!(key, size, content_type, "Object stored");
        Ok(())
    }

    async fn download_url(&self, key: &str) -> Result<String, CoreError> {
        let path = self.path_for(key)?;
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| CoreError::Connection(e.to_string()))?;
        if !exists {
            return Err(CoreError::NotFound {
                entity: "Object",
                id: key.to_string(),
            });
        }
        Ok(format!("{}/{key}", self.public_base_url))
    }
}
