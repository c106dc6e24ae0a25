use std::sync::Arc;

use notesync_core::backend::{AuthProvider, DocumentStore, ObjectStore};

use crate::attachments::AttachmentFlow;
use crate::gateway::MutationGateway;
use crate::session::Session;

/// Everything a screen needs: the backend capabilities plus the session
/// and the write paths built on them.
#[derive(Clone)]
pub struct NoteClient {
    pub session: Arc<Session>,
    pub store: Arc<dyn DocumentStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub gateway: Arc<MutationGateway>,
    pub attachments: Arc<AttachmentFlow>,
}

impl NoteClient {
    /// Wire up a client. Starts the session listener, so it must run inside
    /// a Tokio runtime.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let session = Arc::new(Session::start(auth));
        let gateway = Arc::new(MutationGateway::new(
            Arc::clone(&store),
            Arc::clone(&session),
        ));
        let attachments = Arc::new(AttachmentFlow::new(
            Arc::clone(&objects),
            Arc::clone(&gateway),
        ));
        Self {
            session,
            store,
            objects,
            gateway,
            attachments,
        }
    }
}
