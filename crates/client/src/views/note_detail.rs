use notesync_core::document::{decode, Collection};
use notesync_core::error::CoreError;
use notesync_core::models::{Comment, NewComment, Note, NoteEdit};
use notesync_core::query::CollectionQuery;
use notesync_core::types::DocId;

use crate::attachments::ImageUpload;
use crate::context::NoteClient;
use crate::gateway::settle;
use crate::view_model::CollectionViewModel;

#[derive(Debug, Clone, PartialEq)]
pub enum NoteState {
    Found(Note),
    /// Missing, or private to another user.
    NotFound,
}

/// One note (point read), its live comments and a local edit draft.
pub struct NoteDetailView {
    client: NoteClient,
    note_id: DocId,
    state: NoteState,
    draft: Option<NoteEdit>,
    comments: Option<CollectionViewModel<Comment>>,
}

impl NoteDetailView {
    pub async fn open(client: &NoteClient, note_id: &str) -> Result<Self, CoreError> {
        let state = read_note(client, note_id).await?;
        let comments = match state {
            NoteState::Found(_) => Some(
                CollectionViewModel::open(
                    client.store.as_ref(),
                    CollectionQuery::comments_of(note_id),
                )
                .await?,
            ),
            NoteState::NotFound => None,
        };

        Ok(Self {
            client: client.clone(),
            note_id: note_id.to_string(),
            state,
            draft: None,
            comments,
        })
    }

    pub fn state(&self) -> &NoteState {
        &self.state
    }

    pub fn note(&self) -> Option<&Note> {
        match &self.state {
            NoteState::Found(note) => Some(note),
            NoteState::NotFound => None,
        }
    }

    pub fn is_owner(&self) -> bool {
        match (self.note(), self.client.session.current()) {
            (Some(note), Some(me)) => note.user_id == me.uid,
            _ => false,
        }
    }

    /// Newest first.
    pub fn comments(&self) -> Vec<Comment> {
        self.comments
            .as_ref()
            .map(|vm| vm.items())
            .unwrap_or_default()
    }

    pub fn comments_view_model(&mut self) -> Option<&mut CollectionViewModel<Comment>> {
        self.comments.as_mut()
    }

    // ---- editing ----

    /// Start editing from the current note. Only the owner may edit.
    pub fn begin_edit(&mut self) -> bool {
        if !self.is_owner() {
            return false;
        }
        self.draft = self.note().map(NoteEdit::from);
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&NoteEdit> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut NoteEdit> {
        self.draft.as_mut()
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn cancel_edit(&mut self) {
        self.draft = None;
    }

    /// Send the draft. On failure the draft stays open.
    pub async fn save(&mut self) -> bool {
        let Some(draft) = self.draft.clone() else {
            return false;
        };
        let saved = settle(
            "update_note",
            self.client.gateway.update_note(&self.note_id, &draft).await,
        )
        .is_some();
        if saved {
            self.draft = None;
            self.refresh().await;
        }
        saved
    }

    pub async fn toggle_visibility(&mut self) -> bool {
        let toggled = settle(
            "toggle_visibility",
            self.client.gateway.toggle_visibility(&self.note_id).await,
        )
        .is_some();
        if toggled {
            self.refresh().await;
        }
        toggled
    }

    pub async fn attach(&mut self, upload: ImageUpload) -> Option<String> {
        let reference = settle(
            "attach_image",
            self.client.attachments.attach(&self.note_id, upload).await,
        )?;
        self.refresh().await;
        Some(reference)
    }

    /// The comment shows up through the comments subscription.
    pub async fn post_comment(&self, text: &str) -> bool {
        let input = NewComment {
            text: text.to_string(),
        };
        settle(
            "post_comment",
            self.client.gateway.post_comment(&self.note_id, &input).await,
        )
        .is_some()
    }

    /// Re-read the note. A failed read keeps the current state.
    pub async fn refresh(&mut self) {
        match read_note(&self.client, &self.note_id).await {
            Ok(state) => self.state = state,
            Err(e) => {
                tracing::warn!(note_id = %self.note_id, error = %e, "Failed to re-read note");
            }
        }
    }

    pub fn close(&self) {
        if let Some(comments) = &self.comments {
            comments.close();
        }
    }
}

async fn read_note(client: &NoteClient, note_id: &str) -> Result<NoteState, CoreError> {
    let Some(raw) = client
        .store
        .get(Collection::Notes, note_id)
        .await
        .map_err(|e| CoreError::Connection(e.to_string()))?
    else {
        return Ok(NoteState::NotFound);
    };
    let note: Note = decode(&raw)?;

    let visible = note.is_public
        || client
            .session
            .current()
            .is_some_and(|me| me.uid == note.user_id);
    Ok(if visible {
        NoteState::Found(note)
    } else {
        NoteState::NotFound
    })
}
