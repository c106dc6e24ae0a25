use notesync_core::error::CoreError;
use notesync_core::models::Note;
use notesync_core::query::CollectionQuery;

use super::{summarize, NoteSummary};
use crate::context::NoteClient;
use crate::view_model::CollectionViewModel;

/// Public notes of every user, newest first.
pub struct HomeFeed {
    notes: CollectionViewModel<Note>,
}

impl HomeFeed {
    pub async fn open(client: &NoteClient) -> Result<Self, CoreError> {
        let notes =
            CollectionViewModel::open(client.store.as_ref(), CollectionQuery::public_feed()).await?;
        Ok(Self { notes })
    }

    pub fn items(&self) -> Vec<NoteSummary> {
        summarize(&self.notes.snapshot().items)
    }

    pub fn view_model(&mut self) -> &mut CollectionViewModel<Note> {
        &mut self.notes
    }

    pub fn close(&self) {
        self.notes.close();
    }
}
