//! Session state: the current identity, driven by the auth provider.
//!
//! The session is an explicit value created at start-up and shared by
//! reference. Its state changes only inside the listener task that
//! forwards the provider's identity notifications.

use std::sync::Arc;
use std::time::Duration;

use notesync_core::backend::AuthProvider;
use notesync_core::error::CoreError;
use notesync_core::models::Identity;
use notesync_core::routes::{Gate, Route};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// How long sign-in/out wait for the provider to push the new state.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Session {
    auth: Arc<dyn AuthProvider>,
    state: watch::Receiver<Option<Identity>>,
    cancel: CancellationToken,
}

impl Session {
    /// Start listening to `auth`. Must be called inside a Tokio runtime.
    pub fn start(auth: Arc<dyn AuthProvider>) -> Self {
        let mut changes = auth.identity_changes();
        let initial = changes.borrow_and_update().clone();
        let (tx, rx) = watch::channel(initial);
        let cancel = CancellationToken::new();

        tokio::spawn(forward_identity_changes(changes, tx, cancel.clone()));

        Self {
            auth,
            state: rx,
            cancel,
        }
    }

    pub fn current(&self) -> Option<Identity> {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Receiver that observes every session transition.
    pub fn changes(&self) -> watch::Receiver<Option<Identity>> {
        self.state.clone()
    }

    /// The signed-in identity, or [`CoreError::Auth`].
    pub fn require_identity(&self) -> Result<Identity, CoreError> {
        self.current()
            .ok_or_else(|| CoreError::Auth("Not signed in".into()))
    }

    pub fn gate(&self, route: &Route) -> Gate {
        route.gate(self.is_authenticated())
    }

    /// Sign in and wait until the listener has applied the new identity.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, CoreError> {
        let identity = self.auth.sign_in(email, password).await.map_err(auth_error)?;

        let uid = identity.uid.clone();
        self.settle(move |state| state.as_ref().is_some_and(|i| i.uid == uid))
            .await;
        Ok(identity)
    }

    pub async fn sign_out(&self) -> Result<(), CoreError> {
        self.auth.sign_out().await.map_err(auth_error)?;
        self.settle(|state| state.is_none()).await;
        Ok(())
    }

    /// Stop the listener. Further provider notifications are ignored.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn settle(&self, reached: impl FnMut(&Option<Identity>) -> bool) {
        let mut rx = self.state.clone();
        let settled = tokio::time::timeout(SETTLE_TIMEOUT, rx.wait_for(reached))
            .await
            .is_ok_and(|r| r.is_ok());
        if !settled {
            tracing::warn!("Auth provider did not confirm the session change in time");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn auth_error(e: CoreError) -> CoreError {
    match e {
        CoreError::Auth(_) => e,
        other => CoreError::Auth(other.to_string()),
    }
}

async fn forward_identity_changes(
    mut changes: watch::Receiver<Option<Identity>>,
    state: watch::Sender<Option<Identity>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    tracing::debug!("Auth provider dropped its notifier, session listener exiting");
                    break;
                }
                let identity = changes.borrow_and_update().clone();
                match &identity {
                    Some(i) => tracing::info!(user_id = %i.uid, "Session authenticated"),
                    None => tracing::info!("Session unauthenticated"),
                }
                state.send_replace(identity);
            }
        }
    }
}
