//! Per-screen presentation state.
//!
//! Each view owns the view-models of its screen and closes them in
//! `close` (and on drop). Write actions go through the mutation gateway,
//! log failures and report only whether they were accepted.

pub mod add_note;
pub mod feed;
pub mod folder_notes;
pub mod folders;
pub mod note_detail;
pub mod profile;

use notesync_core::models::Note;
use notesync_core::text::{excerpt, EXCERPT_CHARS};
use notesync_core::types::{DocId, Timestamp};
use serde::Serialize;

pub use add_note::AddNoteView;
pub use feed::HomeFeed;
pub use folder_notes::FolderNotesView;
pub use folders::FolderListView;
pub use note_detail::{NoteDetailView, NoteState};
pub use profile::ProfileView;

/// A note as shown in lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteSummary {
    pub id: DocId,
    pub folder_id: DocId,
    pub title: String,
    pub excerpt: String,
    pub is_public: bool,
    pub image_count: usize,
    pub created_at: Timestamp,
}

impl From<&Note> for NoteSummary {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            folder_id: note.folder_id.clone(),
            title: note.title.clone(),
            excerpt: excerpt(&note.content, EXCERPT_CHARS),
            is_public: note.is_public,
            image_count: note.images.len(),
            created_at: note.created_at,
        }
    }
}

pub fn summarize(notes: &[Note]) -> Vec<NoteSummary> {
    notes.iter().map(NoteSummary::from).collect()
}
