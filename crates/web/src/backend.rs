//! Backend selection and start-up.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use notesync_client::memory::{MemoryAuth, MemoryObjectStore, MemoryStore};
use notesync_client::NoteClient;
use notesync_core::backend::{AuthProvider, DocumentStore, ObjectStore};
use notesync_db::listener::spawn_change_listener;
use notesync_db::{LocalObjectStore, PgDocumentStore};
use notesync_events::ChangeBus;
use notesync_hosted::{HostedApi, HostedAuth, HostedBackend, HostedConfig, TokenCell};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{BackendKind, HostedSettings, WebConfig};
use crate::routes::files::ObjectFiles;

/// How long shutdown waits for each background task.
const TASK_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A wired client plus the background work its backend needs.
pub struct Backend {
    pub client: NoteClient,
    /// Objects to serve under `/files`, for stores without their own host.
    pub files: Option<ObjectFiles>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Backend {
    pub async fn connect(config: &WebConfig) -> anyhow::Result<Self> {
        let backend = match config.backend {
            BackendKind::Memory => Self::memory(config).await,
            BackendKind::Postgres => Self::postgres(config).await?,
            BackendKind::Hosted => Self::hosted(config)?,
        };
        tracing::info!(backend = config.backend.as_str(), "Backend ready");
        Ok(backend)
    }

    /// In-process backend with the demo account registered.
    pub async fn memory(config: &WebConfig) -> Self {
        let auth = MemoryAuth::new();
        let demo = &config.demo;
        auth.register(&demo.email, &demo.password, Some(&demo.name)).await;
        tracing::info!(email = %demo.email, "Demo account registered");

        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let memory_objects = Arc::new(MemoryObjectStore::new(config.storage_public_url.clone()));
        let objects: Arc<dyn ObjectStore> = Arc::clone(&memory_objects) as _;

        let mut backend = Self::from_parts(store, objects, Arc::new(auth));
        backend.files = Some(ObjectFiles::Memory(memory_objects));
        backend
    }

    async fn postgres(config: &WebConfig) -> anyhow::Result<Self> {
        let database_url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set")?;
        let pool = notesync_db::create_pool(database_url)
            .await
            .context("Failed to connect to database")?;
        notesync_db::health_check(&pool)
            .await
            .context("Database health check failed")?;
        notesync_db::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;
        tracing::info!("Database ready");

        tokio::fs::create_dir_all(&config.storage_dir)
            .await
            .with_context(|| format!("Failed to create {}", config.storage_dir.display()))?;

        let bus = Arc::new(ChangeBus::default());
        let store: Arc<dyn DocumentStore> =
            Arc::new(PgDocumentStore::new(pool.clone(), Arc::clone(&bus)));
        let objects: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(
            config.storage_dir.clone(),
            &config.storage_public_url,
        ));
        let auth: Arc<dyn AuthProvider> = Arc::new(HostedAuth::new(HostedApi::new(
            hosted_config(config)?,
            TokenCell::new(),
        )));

        let mut backend = Self::from_parts(store, objects, auth);
        backend.files = Some(ObjectFiles::Dir(config.storage_dir.clone()));
        backend
            .tasks
            .push(spawn_change_listener(pool, bus, backend.cancel.clone()));
        Ok(backend)
    }

    fn hosted(config: &WebConfig) -> anyhow::Result<Self> {
        let hosted = HostedBackend::new(hosted_config(config)?);
        let store: Arc<dyn DocumentStore> = hosted.store;
        let objects: Arc<dyn ObjectStore> = hosted.objects;
        let auth: Arc<dyn AuthProvider> = hosted.auth;
        Ok(Self::from_parts(store, objects, auth))
    }

    fn from_parts(
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            client: NoteClient::new(store, objects, auth),
            files: None,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Stop the session listener and background tasks.
    pub async fn shutdown(self) {
        self.client.session.shutdown();
        self.cancel.cancel();
        for task in self.tasks {
            if tokio::time::timeout(TASK_SHUTDOWN_TIMEOUT, task).await.is_err() {
                tracing::warn!("Background task did not stop in time");
            }
        }
    }
}

fn hosted_config(config: &WebConfig) -> anyhow::Result<HostedConfig> {
    let HostedSettings {
        url,
        anon_key,
        bucket,
    } = config
        .hosted
        .as_ref()
        .context("HOSTED_URL and HOSTED_ANON_KEY must be set")?;
    Ok(HostedConfig::new(url, anon_key, bucket))
}
