use notesync_core::error::CoreError;
use notesync_core::models::{Folder, FolderInput};
use notesync_core::query::CollectionQuery;
use notesync_core::types::DocId;

use crate::context::NoteClient;
use crate::gateway::settle;
use crate::view_model::CollectionViewModel;

/// The signed-in user's folders, live.
pub struct FolderListView {
    client: NoteClient,
    folders: CollectionViewModel<Folder>,
}

impl FolderListView {
    pub async fn open(client: &NoteClient) -> Result<Self, CoreError> {
        let me = client.session.require_identity()?;
        let folders =
            CollectionViewModel::open(client.store.as_ref(), CollectionQuery::folders_of(&me.uid))
                .await?;
        Ok(Self {
            client: client.clone(),
            folders,
        })
    }

    pub fn folders(&self) -> Vec<Folder> {
        self.folders.items()
    }

    pub fn view_model(&mut self) -> &mut CollectionViewModel<Folder> {
        &mut self.folders
    }

    /// The new folder shows up through the subscription.
    pub async fn create(&self, input: &FolderInput) -> Option<DocId> {
        settle("create_folder", self.client.gateway.create_folder(input).await)
    }

    pub async fn edit(&self, folder_id: &str, input: &FolderInput) -> bool {
        settle(
            "update_folder",
            self.client.gateway.update_folder(folder_id, input).await,
        )
        .is_some()
    }

    pub fn close(&self) {
        self.folders.close();
    }
}
