//! Uploaded objects, served read-only under `/files`.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use notesync_client::memory::MemoryObjectStore;
use tower_http::services::ServeDir;

/// Where the objects behind `/files` references live.
#[derive(Clone)]
pub enum ObjectFiles {
    /// The local filesystem object store.
    Dir(PathBuf),
    /// The in-process object store of the memory backend.
    Memory(Arc<MemoryObjectStore>),
}

/// Mount `files` at `path` on `router`.
pub fn mount<S>(router: Router<S>, path: &str, files: &ObjectFiles) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    match files {
        ObjectFiles::Dir(dir) => router.nest_service(path, ServeDir::new(dir)),
        ObjectFiles::Memory(objects) => router.nest_service(
            path,
            Router::new()
                .route("/{*key}", get(memory_object))
                .with_state(Arc::clone(objects)),
        ),
    }
}

/// GET /files/{*key}
async fn memory_object(
    State(objects): State<Arc<MemoryObjectStore>>,
    Path(key): Path<String>,
) -> Response {
    match objects.object(&key).await {
        Some(object) => ([(header::CONTENT_TYPE, object.content_type)], object.bytes).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
