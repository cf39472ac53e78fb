//! Session data model and persistence.
//!
//! A [`Session`] is the sole persisted credential record: one access/refresh
//! token pair, the account identity the provider reported at login, and the
//! requested scopes. At most one session exists at a time — the
//! [`SessionStore`] keeps it under a single fixed key in the secret store,
//! so creating a new session structurally supersedes the old one.
//!
//! The JSON field names (`accessToken`, `expiresInMs`, …) match the wire
//! format the original product persisted, so a store written by one build
//! parses in the next. `expiresInMs` holds an absolute Unix-epoch
//! millisecond timestamp despite its name; the Rust field is named for
//! what the value actually is.

use serde::{Deserialize, Serialize};

use wingman_secrets::SecretStore;

use crate::error::{AuthError, Result};

/// The secret-store key under which the current session is persisted.
pub const SESSION_SECRET_KEY: &str = "wingman.auth.session";

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// The account identity reported by the identity provider at login.
///
/// Both fields come from the redirect callback; they are never derived
/// locally and never change across refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Human-readable display name (e.g. "Ada Lovelace").
    pub label: String,
    /// Stable identity, typically the account email.
    pub id: String,
}

/// The persisted credential record for the signed-in account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque unique identifier, stable for the session's lifetime.
    pub id: String,

    /// Short-lived bearer token for API calls.
    #[serde(rename = "accessToken")]
    pub access_token: String,

    /// Long-lived token exchanged for fresh access tokens.
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,

    /// Absolute Unix-epoch milliseconds after which the access token is
    /// stale and must be refreshed.
    #[serde(rename = "expiresInMs")]
    pub expires_at_ms: i64,

    /// The account this session belongs to.
    pub account: Account,

    /// Requested scopes in canonical order; empty means "default scope".
    pub scopes: Vec<String>,
}

/// Sort and deduplicate a scope list into its canonical form.
pub fn canonical_scopes(scopes: &[String]) -> Vec<String> {
    let mut scopes: Vec<String> = scopes.to_vec();
    scopes.sort();
    scopes.dedup();
    scopes
}

/// The dedup key for concurrent login attempts: canonical scopes joined
/// with a single space. The empty scope set maps to the empty string.
pub fn scope_key(scopes: &[String]) -> String {
    canonical_scopes(scopes).join(" ")
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Single-slot session persistence on top of a [`SecretStore`].
///
/// The store is strict: a payload that fails to parse surfaces as
/// [`AuthError::StorageCorrupt`]. Policy for corrupt payloads (treat as
/// "no session", discard the entry) lives in the manager, not here.
pub struct SessionStore {
    secrets: std::sync::Arc<dyn SecretStore>,
}

impl SessionStore {
    /// Create a session store backed by the given secret store.
    pub fn new(secrets: std::sync::Arc<dyn SecretStore>) -> Self {
        Self { secrets }
    }

    /// Load the current session, if one is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StorageCorrupt`] if a payload exists but does
    /// not parse, and [`AuthError::Secrets`] if the underlying store fails.
    pub fn load(&self) -> Result<Option<Session>> {
        let Some(payload) = self.secrets.get(SESSION_SECRET_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str(&payload) {
            Ok(session) => Ok(Some(session)),
            Err(e) => Err(AuthError::StorageCorrupt {
                reason: e.to_string(),
            }),
        }
    }

    /// Persist `session`, overwriting any prior session atomically with
    /// respect to readers of the secret store.
    pub fn save(&self, session: &Session) -> Result<()> {
        let payload = serde_json::to_string(session)?;
        self.secrets.set(SESSION_SECRET_KEY, &payload)?;
        tracing::debug!(session_id = %session.id, "session persisted");
        Ok(())
    }

    /// Delete the persisted session. A no-op when none exists.
    pub fn delete(&self) -> Result<()> {
        self.secrets.delete(SESSION_SECRET_KEY)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
