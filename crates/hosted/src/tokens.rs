use std::time::Duration;

use tokio::sync::watch;

/// Credentials of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of `access_token` from the moment it was issued.
    pub expires_in: Duration,
}

/// Shared holder of the current tokens.
///
/// Auth writes it; REST, storage and realtime read it. Realtime channels
/// also watch it to forward refreshed access tokens.
#[derive(Clone)]
pub struct TokenCell {
    tx: watch::Sender<Option<AuthTokens>>,
}

impl TokenCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn current(&self) -> Option<AuthTokens> {
        self.tx.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|t| t.access_token.clone())
    }

    pub fn set(&self, tokens: AuthTokens) {
        self.tx.send_replace(Some(tokens));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn watch(&self) -> watch::Receiver<Option<AuthTokens>> {
        self.tx.subscribe()
    }
}

impl Default for TokenCell {
    fn default() -> Self {
        Self::new()
    }
}
