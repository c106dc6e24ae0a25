use notesync_core::document::decode;
use notesync_core::error::CoreError;
use notesync_core::models::{Folder, NewNote};
use notesync_core::query::CollectionQuery;
use notesync_core::types::DocId;

use crate::context::NoteClient;
use crate::gateway::settle;

/// The add-note form: the user's folders and the preselected one.
pub struct AddNoteView {
    client: NoteClient,
    folders: Vec<Folder>,
    selected: Option<DocId>,
}

impl AddNoteView {
    /// Load the folder choices. The folder from the route wins, otherwise
    /// the first folder is preselected.
    pub async fn load(client: &NoteClient, scoped_folder: Option<&str>) -> Result<Self, CoreError> {
        let me = client.session.require_identity()?;
        let raw = client
            .store
            .query(&CollectionQuery::folders_of(&me.uid))
            .await
            .map_err(|e| CoreError::Connection(e.to_string()))?;

        let folders: Vec<Folder> = raw
            .iter()
            .filter_map(|doc| match decode(doc) {
                Ok(folder) => Some(folder),
                Err(e) => {
                    tracing::warn!(doc_id = %doc.id, error = %e, "Skipping malformed folder");
                    None
                }
            })
            .collect();

        let selected = match scoped_folder {
            Some(id) => Some(id.to_string()),
            None => folders.first().map(|f| f.id.clone()),
        };

        Ok(Self {
            client: client.clone(),
            folders,
            selected,
        })
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn selected_folder(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select(&mut self, folder_id: &str) {
        self.selected = Some(folder_id.to_string());
    }

    /// Create the note in the selected folder. Without one nothing is sent.
    pub async fn submit(&self, title: &str, content: &str, is_public: bool) -> Option<DocId> {
        let Some(folder_id) = self.selected.clone() else {
            tracing::warn!("Add-note submitted without a folder");
            return None;
        };
        let input = NewNote {
            folder_id,
            title: title.to_string(),
            content: content.to_string(),
            is_public,
        };
        settle("create_note", self.client.gateway.create_note(&input).await)
    }
}
