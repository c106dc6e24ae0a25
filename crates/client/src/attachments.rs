//! Image attachment: upload, resolve a download reference, append it to
//! the note.

use std::sync::Arc;

use notesync_core::backend::ObjectStore;
use notesync_core::error::CoreError;
use notesync_core::storage::{detect_image_mime, image_object_key};

use crate::gateway::{write_error, MutationGateway};

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct AttachmentFlow {
    objects: Arc<dyn ObjectStore>,
    gateway: Arc<MutationGateway>,
}

impl AttachmentFlow {
    pub fn new(objects: Arc<dyn ObjectStore>, gateway: Arc<MutationGateway>) -> Self {
        Self { objects, gateway }
    }

    /// Attach an image to a note the caller owns and return its download
    /// reference.
    ///
    /// Every upload gets a fresh key, so attaching the same file twice
    /// stores two objects and appends two references.
    pub async fn attach(&self, note_id: &str, upload: ImageUpload) -> Result<String, CoreError> {
        let content_type = detect_image_mime(&upload.bytes)?;
        let key = image_object_key(note_id, &upload.file_name)?;
        // Checked before uploading so a foreign note never gets objects.
        self.gateway.owned_note(note_id).await?;

        let size = upload.bytes.len();
        self.objects
            .upload(&key, upload.bytes, content_type)
            .await
            .map_err(write_error)?;
        let reference = self
            .objects
            .download_url(&key)
            .await
            .map_err(write_error)?;

        self.gateway.append_image(note_id, &reference).await?;
        tracing::info!(note_id, key = %key, size, content_type, "Image attached");
        Ok(reference)
    }
}
