//! Email/password auth against the GoTrue dialect.
//!
//! A successful sign-in stores the tokens in the shared [`TokenCell`] and
//! starts a background task that refreshes the access token shortly before
//! it expires. A refresh that fails signs the user out locally.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use notesync_core::backend::AuthProvider;
use notesync_core::error::CoreError;
use notesync_core::models::Identity;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::api::{HostedApi, HostedError};
use crate::tokens::AuthTokens;

/// Refresh this long before the access token expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lower bound on the wait between refreshes.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until `access_token` expires.
    pub expires_in: u64,
    pub user: AuthUser,
}

#[derive(Debug, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Map<String, serde_json::Value>,
}

impl AuthUser {
    /// The display name from user metadata, under any of the keys sign-up
    /// flows commonly use.
    pub fn display_name(&self) -> Option<String> {
        ["display_name", "full_name", "name"]
            .iter()
            .find_map(|key| self.user_metadata.get(*key)?.as_str())
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
    }

    pub fn identity(&self) -> Identity {
        Identity {
            uid: self.id.clone(),
            email: self.email.clone().unwrap_or_default(),
            display_name: self.display_name(),
        }
    }
}

impl TokenGrant {
    fn tokens(&self) -> AuthTokens {
        AuthTokens {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_in: Duration::from_secs(self.expires_in),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct HostedAuth {
    api: HostedApi,
    identity: watch::Sender<Option<Identity>>,
    /// Cancels the refresh task of the current sign-in.
    refresh: Mutex<Option<CancellationToken>>,
}

impl HostedAuth {
    pub fn new(api: HostedApi) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            api,
            identity,
            refresh: Mutex::new(None),
        }
    }

    async fn password_grant(&self, email: &str, password: &str) -> Result<TokenGrant, HostedError> {
        let response = self
            .api
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        HostedApi::parse_response(response).await
    }

    async fn logout(&self) -> Result<(), HostedError> {
        let response = self
            .api
            .request(Method::POST, "/auth/v1/logout")
            .send()
            .await?;
        HostedApi::check_status(response).await
    }

    /// Swap in a new refresh task, cancelling the previous one.
    fn replace_refresh_task(&self, next: Option<CancellationToken>) {
        let previous = match self.refresh.lock() {
            Ok(mut slot) => std::mem::replace(&mut *slot, next),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), next),
        };
        if let Some(token) = previous {
            token.cancel();
        }
    }
}

async fn refresh_grant(api: &HostedApi, refresh_token: &str) -> Result<TokenGrant, HostedError> {
    let response = api
        .request(Method::POST, "/auth/v1/token")
        .query(&[("grant_type", "refresh_token")])
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await?;
    HostedApi::parse_response(response).await
}

fn refresh_delay(expires_in: Duration) -> Duration {
    expires_in
        .saturating_sub(REFRESH_MARGIN)
        .max(MIN_REFRESH_INTERVAL)
}

async fn refresh_loop(
    api: HostedApi,
    identity: watch::Sender<Option<Identity>>,
    cancel: CancellationToken,
    mut expires_in: Duration,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(refresh_delay(expires_in)) => {}
        }

        let Some(current) = api.tokens().current() else {
            return;
        };
        let result = tokio::select! {
            _ = cancel.cancelled() => return,
            result = refresh_grant(&api, &current.refresh_token) => result,
        };

        match result {
            Ok(grant) => {
                expires_in = Duration::from_secs(grant.expires_in);
                api.tokens().set(grant.tokens());
                tracing::debug!(user_id = %grant.user.id, "Access token refreshed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, signing out");
                api.tokens().clear();
                identity.send_replace(None);
                return;
            }
        }
    }
}

#[async_trait]
impl AuthProvider for HostedAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, CoreError> {
        let grant = match self.password_grant(email, password).await {
            Ok(grant) => grant,
            // GoTrue answers bad credentials with 400.
            Err(HostedError::Api { status: 400, .. }) => {
                return Err(CoreError::Auth("Invalid email or password".into()));
            }
            Err(e) => return Err(e.into_auth()),
        };

        let identity = grant.user.identity();
        let expires_in = Duration::from_secs(grant.expires_in);
        self.api.tokens().set(grant.tokens());

        let cancel = CancellationToken::new();
        self.replace_refresh_task(Some(cancel.clone()));
        tokio::spawn(refresh_loop(
            self.api.clone(),
            self.identity.clone(),
            cancel,
            expires_in,
        ));

        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    /// Local state is cleared even when the remote logout fails; the error
    /// is still reported.
    async fn sign_out(&self) -> Result<(), CoreError> {
        let remote = if self.api.tokens().current().is_some() {
            self.logout().await
        } else {
            Ok(())
        };

        self.replace_refresh_task(None);
        self.api.tokens().clear();
        self.identity.send_replace(None);

        remote.map_err(HostedError::into_auth)
    }

    fn identity_changes(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }
}

impl Drop for HostedAuth {
    fn drop(&mut self) {
        self.replace_refresh_task(None);
    }
}
