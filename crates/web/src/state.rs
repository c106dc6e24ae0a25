use std::sync::Arc;

use notesync_client::NoteClient;

use crate::config::WebConfig;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// The signed-in user's client: session, views and write paths.
    pub client: NoteClient,
    pub config: Arc<WebConfig>,
}
