//! Mutation gateway: every create and update the client sends.
//!
//! The gateway never touches a view-model. Callers learn about the effect
//! of a write through their own subscriptions. Ownership is checked here,
//! before anything is sent, because the document store enforces no schema.

use std::sync::Arc;

use chrono::Utc;
use notesync_core::backend::DocumentStore;
use notesync_core::document::{decode, Collection, Document};
use notesync_core::error::CoreError;
use notesync_core::models::{Folder, FolderInput, Identity, NewComment, NewNote, Note, NoteEdit};
use notesync_core::query::field;
use notesync_core::types::{DocId, Fields};
use serde_json::{json, Value};

use crate::session::Session;

pub struct MutationGateway {
    store: Arc<dyn DocumentStore>,
    session: Arc<Session>,
}

impl MutationGateway {
    pub fn new(store: Arc<dyn DocumentStore>, session: Arc<Session>) -> Self {
        Self { store, session }
    }

    // ---- folders ----

    pub async fn create_folder(&self, input: &FolderInput) -> Result<DocId, CoreError> {
        input.check()?;
        let me = self.session.require_identity()?;

        let id = self
            .create(
                Collection::Folders,
                fields([
                    (field::USER_ID, json!(me.uid)),
                    (field::NAME, json!(input.name)),
                    (field::DESCRIPTION, json!(input.description)),
                ]),
            )
            .await?;
        tracing::info!(user_id = %me.uid, doc_id = %id, "Folder created");
        Ok(id)
    }

    pub async fn update_folder(&self, folder_id: &str, input: &FolderInput) -> Result<(), CoreError> {
        input.check()?;
        let me = self.session.require_identity()?;
        let folder: Folder = self.load(folder_id).await?;
        ensure_owner(&me, &folder.user_id, "folder")?;

        self.update(
            Collection::Folders,
            folder_id,
            fields([
                (field::NAME, json!(input.name)),
                (field::DESCRIPTION, json!(input.description)),
            ]),
        )
        .await
    }

    // ---- notes ----

    /// Create a note in one of the caller's own folders.
    pub async fn create_note(&self, input: &NewNote) -> Result<DocId, CoreError> {
        input.check()?;
        let me = self.session.require_identity()?;
        let folder: Folder = self.load(&input.folder_id).await?;
        ensure_owner(&me, &folder.user_id, "folder")?;

        let id = self
            .create(
                Collection::Notes,
                fields([
                    (field::USER_ID, json!(me.uid)),
                    (field::FOLDER_ID, json!(folder.id)),
                    (field::TITLE, json!(input.title)),
                    (field::CONTENT, json!(input.content)),
                    (field::IS_PUBLIC, json!(input.is_public)),
                    (field::IMAGES, json!([])),
                    (field::CREATED_AT, json!(Utc::now())),
                ]),
            )
            .await?;
        tracing::info!(user_id = %me.uid, doc_id = %id, folder_id = %folder.id, "Note created");
        Ok(id)
    }

    /// Save an edit draft. The image list is not part of the payload, so
    /// images attached while the draft was open are kept.
    pub async fn update_note(&self, note_id: &str, edit: &NoteEdit) -> Result<(), CoreError> {
        edit.check()?;
        self.owned_note(note_id).await?;

        self.update(
            Collection::Notes,
            note_id,
            fields([
                (field::TITLE, json!(edit.title)),
                (field::CONTENT, json!(edit.content)),
                (field::IS_PUBLIC, json!(edit.is_public)),
                (field::UPDATED_AT, json!(Utc::now())),
            ]),
        )
        .await
    }

    /// Write the visibility flag. Setting the current value still writes.
    pub async fn set_visibility(&self, note_id: &str, is_public: bool) -> Result<(), CoreError> {
        self.owned_note(note_id).await?;
        self.update(
            Collection::Notes,
            note_id,
            fields([(field::IS_PUBLIC, json!(is_public))]),
        )
        .await
    }

    /// Flip the visibility flag and return the new value.
    pub async fn toggle_visibility(&self, note_id: &str) -> Result<bool, CoreError> {
        let note = self.owned_note(note_id).await?;
        let is_public = !note.is_public;
        self.update(
            Collection::Notes,
            note_id,
            fields([(field::IS_PUBLIC, json!(is_public))]),
        )
        .await?;
        Ok(is_public)
    }

    /// Append one download reference to a note's image list.
    ///
    /// Read-modify-write: two appends racing from different clients can
    /// lose one reference, the later write wins.
    pub async fn append_image(&self, note_id: &str, reference: &str) -> Result<(), CoreError> {
        let note = self.owned_note(note_id).await?;
        let mut images = note.images;
        images.push(reference.to_string());

        self.update(
            Collection::Notes,
            note_id,
            fields([(field::IMAGES, json!(images))]),
        )
        .await
    }

    /// Load a note and check that the signed-in user owns it.
    pub async fn owned_note(&self, note_id: &str) -> Result<Note, CoreError> {
        let me = self.session.require_identity()?;
        let note: Note = self.load(note_id).await?;
        ensure_owner(&me, &note.user_id, "note")?;
        Ok(note)
    }

    // ---- comments ----

    /// Post a comment as the signed-in user. Blank text is rejected before
    /// anything is sent.
    pub async fn post_comment(&self, note_id: &str, input: &NewComment) -> Result<DocId, CoreError> {
        input.check()?;
        let me = self.session.require_identity()?;
        let note: Note = self.load(note_id).await?;
        // Same rule as the detail screen: a hidden note does not exist.
        if !note.is_public && note.user_id != me.uid {
            return Err(CoreError::NotFound {
                entity: Collection::Notes.entity(),
                id: note_id.to_string(),
            });
        }

        let id = self
            .create(
                Collection::Comments,
                fields([
                    (field::NOTE_ID, json!(note.id)),
                    (field::USER_ID, json!(me.uid)),
                    (field::USER_NAME, json!(me.author_name())),
                    (field::TEXT, json!(input.text)),
                    (field::CREATED_AT, json!(Utc::now())),
                ]),
            )
            .await?;
        tracing::info!(user_id = %me.uid, doc_id = %id, note_id = %note.id, "Comment posted");
        Ok(id)
    }

    // ---- helpers ----

    async fn load<T: Document>(&self, id: &str) -> Result<T, CoreError> {
        let raw = self
            .store
            .get(T::COLLECTION, id)
            .await
            .map_err(write_error)?
            .ok_or_else(|| CoreError::NotFound {
                entity: T::COLLECTION.entity(),
                id: id.to_string(),
            })?;
        decode(&raw)
    }

    async fn create(&self, collection: Collection, fields: Fields) -> Result<DocId, CoreError> {
        self.store
            .create(collection, fields)
            .await
            .map_err(write_error)
    }

    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<(), CoreError> {
        self.store
            .update(collection, id, fields)
            .await
            .map_err(write_error)?;
        tracing::debug!(%collection, doc_id = %id, "Update sent");
        Ok(())
    }
}

/// Log a failed mutation and swallow it.
///
/// Returns the value on success. Callers keep their pre-mutation state on
/// `None` and rely on their subscriptions otherwise.
pub fn settle<T>(action: &str, result: Result<T, CoreError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(action, code = e.code(), error = %e, "Mutation failed");
            None
        }
    }
}

fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Fields {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn ensure_owner(me: &Identity, owner_id: &str, what: &str) -> Result<(), CoreError> {
    if me.uid != owner_id {
        return Err(CoreError::Forbidden(format!("This {what} belongs to another user")));
    }
    Ok(())
}

pub(crate) fn write_error(e: CoreError) -> CoreError {
    match e {
        CoreError::Write(_) | CoreError::Auth(_) => e,
        other => CoreError::Write(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use notesync_core::backend::AuthProvider;

    use super::*;
    use crate::memory::{MemoryAuth, MemoryStore};

    async fn signed_in() -> (MemoryStore, Arc<MemoryAuth>, MutationGateway) {
        let store = MemoryStore::new();
        let auth = Arc::new(MemoryAuth::new());
        auth.register("ada@example.com", "pw", Some("Ada")).await;
        auth.register("bob@example.com", "pw", None).await;
        let session = Arc::new(Session::start(Arc::clone(&auth) as Arc<dyn AuthProvider>));
        session.sign_in("ada@example.com", "pw").await.unwrap();
        let gateway = MutationGateway::new(Arc::new(store.clone()), session);
        (store, auth, gateway)
    }

    fn folder_input(name: &str) -> FolderInput {
        FolderInput {
            name: name.into(),
            description: "All my recipes".into(),
        }
    }

    fn new_note(folder_id: &str) -> NewNote {
        NewNote {
            folder_id: folder_id.into(),
            title: "Soup".into(),
            content: "Boil water".into(),
            is_public: false,
        }
    }

    #[tokio::test]
    async fn create_note_stamps_owner_and_defaults() {
        let (store, _, gateway) = signed_in().await;
        let folder_id = gateway.create_folder(&folder_input("Recipes")).await.unwrap();
        let note_id = gateway.create_note(&new_note(&folder_id)).await.unwrap();

        let raw = store.get(Collection::Notes, &note_id).await.unwrap().unwrap();
        let note: Note = decode(&raw).unwrap();
        assert_eq!(note.folder_id, folder_id);
        assert!(note.images.is_empty());
        assert!(!note.is_public);
        assert!(note.updated_at.is_none());
    }

    #[tokio::test]
    async fn create_note_in_missing_folder_is_not_found() {
        let (store, _, gateway) = signed_in().await;
        let result = gateway.create_note(&new_note("nope")).await;
        assert_matches!(result, Err(CoreError::NotFound { entity: "Folder", .. }));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn toggle_twice_restores_visibility() {
        let (_, _, gateway) = signed_in().await;
        let folder_id = gateway.create_folder(&folder_input("F")).await.unwrap();
        let note_id = gateway.create_note(&new_note(&folder_id)).await.unwrap();

        assert!(gateway.toggle_visibility(&note_id).await.unwrap());
        assert!(!gateway.toggle_visibility(&note_id).await.unwrap());
    }

    #[tokio::test]
    async fn update_note_keeps_images_and_stamps_updated_at() {
        let (store, _, gateway) = signed_in().await;
        let folder_id = gateway.create_folder(&folder_input("F")).await.unwrap();
        let note_id = gateway.create_note(&new_note(&folder_id)).await.unwrap();
        gateway.append_image(&note_id, "http://files/a.png").await.unwrap();

        let edit = NoteEdit {
            title: "Stew".into(),
            content: "Simmer".into(),
            is_public: true,
        };
        gateway.update_note(&note_id, &edit).await.unwrap();

        let note: Note = decode(&store.get(Collection::Notes, &note_id).await.unwrap().unwrap()).unwrap();
        assert_eq!(note.title, "Stew");
        assert!(note.is_public);
        assert_eq!(note.images, ["http://files/a.png"]);
        assert!(note.updated_at.is_some());
    }

    #[tokio::test]
    async fn other_users_cannot_edit_a_note() {
        let (_, _, gateway) = signed_in().await;
        let folder_id = gateway.create_folder(&folder_input("F")).await.unwrap();
        let note_id = gateway.create_note(&new_note(&folder_id)).await.unwrap();

        // Switch the session to the second account.
        gateway.session.sign_in("bob@example.com", "pw").await.unwrap();

        assert_matches!(
            gateway.set_visibility(&note_id, true).await,
            Err(CoreError::Forbidden(_))
        );
        assert_matches!(
            gateway.create_note(&new_note(&folder_id)).await,
            Err(CoreError::Forbidden(_))
        );
    }

    #[tokio::test]
    async fn comment_carries_author_name() {
        let (store, _, gateway) = signed_in().await;
        let folder_id = gateway.create_folder(&folder_input("F")).await.unwrap();
        let note_id = gateway.create_note(&new_note(&folder_id)).await.unwrap();

        let comment_id = gateway
            .post_comment(&note_id, &NewComment { text: "Tasty".into() })
            .await
            .unwrap();
        let raw = store.get(Collection::Comments, &comment_id).await.unwrap().unwrap();
        assert_eq!(raw.fields[field::USER_NAME], json!("Ada"));
        assert_eq!(raw.fields[field::NOTE_ID], json!(note_id));
    }

    #[tokio::test]
    async fn store_failures_surface_as_write_errors() {
        let (store, _, gateway) = signed_in().await;
        let folder_id = gateway.create_folder(&folder_input("F")).await.unwrap();
        store.set_offline(true);

        assert_matches!(
            gateway.update_folder(&folder_id, &folder_input("G")).await,
            Err(CoreError::Write(_))
        );
    }

    #[test]
    fn settle_swallows_errors() {
        assert_eq!(settle("x", Ok::<_, CoreError>(3)), Some(3));
        assert_eq!(settle::<()>("x", Err(CoreError::Write("no".into()))), None);
    }
}
