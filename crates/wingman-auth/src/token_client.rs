//! Token endpoint client.
//!
//! Exchanges a refresh token for a new access/refresh token pair. The
//! [`TokenEndpoint`] trait is the seam the manager depends on; tests
//! script it, production uses [`HttpTokenEndpoint`] against the configured
//! token URL.
//!
//! Wire shape: `POST {token_url}` with body `{"refreshToken": "..."}`;
//! success responses carry `{"data": {"accessToken": "...",
//! "refreshToken": "..."}}`. The endpoint reports no expiry — the client
//! stamps the grant with `now + expiration window`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{AuthError, Result};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The result of a successful refresh exchange.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// The new short-lived access token.
    pub access_token: String,
    /// The new long-lived refresh token (rotated on every exchange).
    pub refresh_token: String,
    /// Absolute Unix-epoch milliseconds when the new access token goes
    /// stale.
    pub expires_at_ms: i64,
}

/// Request body for the refresh exchange.
#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

/// Success response envelope from the token endpoint.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    data: RefreshData,
}

#[derive(Debug, Deserialize)]
struct RefreshData {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Performs the network exchange that rotates a session's tokens.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange `refresh_token` for a fresh token pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RefreshRejected`] when the endpoint answers
    /// with a non-success status, or [`AuthError::Network`] on transport
    /// failure. The manager treats every error here as fatal for the
    /// session.
    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenGrant>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// [`TokenEndpoint`] backed by `reqwest` against the configured token URL.
pub struct HttpTokenEndpoint {
    token_url: String,
    expiration_window_ms: i64,
    client: reqwest::Client,
}

impl HttpTokenEndpoint {
    /// Build a client for the endpoints in `config`.
    ///
    /// The HTTP client carries an explicit request timeout so a hung
    /// endpoint cannot pin the refresh task indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Network`] if the TLS backend fails to
    /// initialize.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            token_url: config.token_url.clone(),
            expiration_window_ms: config.expiration_window.as_millis() as i64,
            client,
        })
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenGrant> {
        tracing::debug!(token_url = %self.token_url, "exchanging refresh token");

        let response = self
            .client
            .post(&self.token_url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshRejected {
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: RefreshResponse = response.json().await?;
        tracing::debug!("refresh exchange successful");

        Ok(TokenGrant {
            access_token: parsed.data.access_token,
            refresh_token: parsed.data.refresh_token,
            expires_at_ms: chrono::Utc::now().timestamp_millis() + self.expiration_window_ms,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
