use notesync_core::error::CoreError;
use notesync_core::models::{Folder, Note};
use notesync_core::query::CollectionQuery;
use notesync_core::types::DocId;

use super::{summarize, NoteSummary};
use crate::context::NoteClient;
use crate::gateway::settle;
use crate::view_model::{CollectionViewModel, DocumentViewModel};

/// Notes of one folder plus the folder's live name.
pub struct FolderNotesView {
    client: NoteClient,
    folder_id: DocId,
    folder: DocumentViewModel<Folder>,
    notes: CollectionViewModel<Note>,
}

impl FolderNotesView {
    /// Fails with [`CoreError::Forbidden`] for another user's folder.
    pub async fn open(client: &NoteClient, folder_id: &str) -> Result<Self, CoreError> {
        let me = client.session.require_identity()?;
        let folder = DocumentViewModel::<Folder>::open(client.store.as_ref(), folder_id).await?;
        if let Some(f) = folder.current() {
            if f.user_id != me.uid {
                folder.close();
                return Err(CoreError::Forbidden(
                    "This folder belongs to another user".into(),
                ));
            }
        }

        let notes = CollectionViewModel::open(
            client.store.as_ref(),
            CollectionQuery::notes_in_folder(folder_id),
        )
        .await?;

        Ok(Self {
            client: client.clone(),
            folder_id: folder_id.to_string(),
            folder,
            notes,
        })
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    /// Empty until the folder document is known.
    pub fn folder_name(&self) -> String {
        self.folder.current().map(|f| f.name).unwrap_or_default()
    }

    pub fn notes(&self) -> Vec<NoteSummary> {
        summarize(&self.notes.snapshot().items)
    }

    pub fn view_model(&mut self) -> &mut CollectionViewModel<Note> {
        &mut self.notes
    }

    pub async fn toggle_visibility(&self, note_id: &str) -> bool {
        settle(
            "toggle_visibility",
            self.client.gateway.toggle_visibility(note_id).await,
        )
        .is_some()
    }

    pub fn close(&self) {
        self.folder.close();
        self.notes.close();
    }
}
