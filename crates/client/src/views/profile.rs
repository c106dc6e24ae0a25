use notesync_core::document::{decode, Document, RawDocument};
use notesync_core::error::CoreError;
use notesync_core::models::{Folder, Identity, Note};
use notesync_core::query::CollectionQuery;
use serde::Serialize;

use super::{summarize, NoteSummary};
use crate::context::NoteClient;

/// The signed-in user's account, folders and most recent notes.
///
/// Loaded once; not live.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub email: String,
    pub display_name: Option<String>,
    pub folders: Vec<Folder>,
    pub recent_notes: Vec<NoteSummary>,
    /// Inline message when loading failed.
    pub error: Option<String>,
}

impl ProfileView {
    /// Fails only when nobody is signed in. Backend failures end up in
    /// [`error`](Self::error).
    pub async fn load(client: &NoteClient) -> Result<Self, CoreError> {
        let me = client.session.require_identity()?;
        let mut view = Self {
            email: me.email.clone(),
            display_name: me.display_name.clone(),
            folders: Vec::new(),
            recent_notes: Vec::new(),
            error: None,
        };

        match fetch(client, &me).await {
            Ok((folders, notes)) => {
                view.folders = folders;
                view.recent_notes = summarize(&notes);
            }
            Err(e) => {
                tracing::warn!(user_id = %me.uid, error = %e, "Error fetching user data");
                view.error = Some(format!("Failed to fetch user data: {e}"));
            }
        }
        Ok(view)
    }
}

async fn fetch(client: &NoteClient, me: &Identity) -> Result<(Vec<Folder>, Vec<Note>), CoreError> {
    let folders_query = CollectionQuery::folders_of(&me.uid);
    let notes_query = CollectionQuery::recent_notes_of(&me.uid);
    let (folders, notes) = tokio::try_join!(
        client.store.query(&folders_query),
        client.store.query(&notes_query),
    )?;
    Ok((decode_all(&folders)?, decode_all(&notes)?))
}

fn decode_all<T: Document>(docs: &[RawDocument]) -> Result<Vec<T>, CoreError> {
    docs.iter().map(decode::<T>).collect()
}
