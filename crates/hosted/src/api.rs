//! HTTP plumbing shared by the REST, auth and storage clients.
//!
//! Every request carries the project's anon key in the `apikey` header and
//! a bearer token: the signed-in user's access token when there is one,
//! otherwise the anon key itself.

use std::sync::Arc;

use notesync_core::error::CoreError;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::tokens::TokenCell;
use crate::HostedConfig;

/// Errors from the hosted HTTP and realtime layers.
#[derive(Debug, thiserror::Error)]
pub enum HostedError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Hosted API error ({status}): {body}")]
    Api {
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response parsed but did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Unexpected(String),

    #[error("Realtime channel error: {0}")]
    Realtime(String),
}

impl HostedError {
    pub fn into_connection(self) -> CoreError {
        CoreError::Connection(self.to_string())
    }

    pub fn into_write(self) -> CoreError {
        CoreError::Write(self.to_string())
    }

    pub fn into_auth(self) -> CoreError {
        CoreError::Auth(self.to_string())
    }
}

/// Authenticated HTTP access to one hosted project.
#[derive(Clone)]
pub struct HostedApi {
    client: reqwest::Client,
    config: Arc<HostedConfig>,
    tokens: TokenCell,
}

impl HostedApi {
    pub fn new(config: HostedConfig, tokens: TokenCell) -> Self {
        Self::with_client(reqwest::Client::new(), config, tokens)
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, config: HostedConfig, tokens: TokenCell) -> Self {
        Self {
            client,
            config: Arc::new(config),
            tokens,
        }
    }

    pub fn config(&self) -> &HostedConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenCell {
        &self.tokens
    }

    /// Start a request to `path` (which begins with `/`) with the project
    /// headers already set.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self
            .tokens
            .access_token()
            .unwrap_or_else(|| self.config.anon_key.clone());
        self.client
            .request(method, format!("{}{path}", self.config.url))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    // ---- response helpers ----

    /// Map a non-2xx response to [`HostedError::Api`], keeping the body.
    pub async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, HostedError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(HostedError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    pub async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, HostedError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Check the status and discard the body.
    pub async fn check_status(response: reqwest::Response) -> Result<(), HostedError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
