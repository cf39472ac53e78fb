//! Error types for the auth crate.
//!
//! All auth operations surface errors through [`AuthError`], the single
//! error type for this crate. Login failures reach the caller directly;
//! scheduled-refresh failures are never seen by a caller — they manifest
//! only as a `removed` session-change event, and "no session" is the
//! canonical signal to prompt for re-login.

/// Unified error type for the Wingman auth core.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The user cancelled the login flow before the redirect arrived.
    #[error("login cancelled by user")]
    UserCancelled,

    /// No redirect arrived within the login window.
    #[error("login timed out waiting for the browser redirect")]
    LoginTimedOut,

    /// The redirect callback was missing a required credential field.
    #[error("redirect callback missing required field '{field}'")]
    MissingCredentialField {
        /// The query parameter that was absent.
        field: String,
    },

    /// The token endpoint rejected the refresh token.
    #[error("token refresh rejected: {reason}")]
    RefreshRejected {
        /// Explanation from the token endpoint.
        reason: String,
    },

    /// An operation that requires a session found none.
    #[error("no session found")]
    NoSessionFound,

    /// The persisted session failed to parse. Treated as "no session" by
    /// read paths, never as a crash.
    #[error("persisted session is corrupt: {reason}")]
    StorageCorrupt {
        /// Why the stored payload could not be decoded.
        reason: String,
    },

    /// The system browser could not be launched.
    #[error("failed to open browser: {reason}")]
    BrowserLaunch {
        /// Details from the launcher.
        reason: String,
    },

    /// An error propagated from the secret store.
    #[error("secret store error: {0}")]
    Secrets(#[from] wingman_secrets::SecretStoreError),

    /// An HTTP request to the token endpoint failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("url parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The login flow failed for a non-specific reason.
    #[error("login flow failed: {reason}")]
    FlowFailed {
        /// Details about why the flow failed.
        reason: String,
    },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_user_cancelled() {
        assert_eq!(AuthError::UserCancelled.to_string(), "login cancelled by user");
    }

    #[test]
    fn error_display_login_timed_out() {
        assert_eq!(
            AuthError::LoginTimedOut.to_string(),
            "login timed out waiting for the browser redirect"
        );
    }

    #[test]
    fn error_display_missing_field() {
        let err = AuthError::MissingCredentialField {
            field: "refreshToken".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "redirect callback missing required field 'refreshToken'"
        );
    }

    #[test]
    fn error_display_refresh_rejected() {
        let err = AuthError::RefreshRejected {
            reason: "HTTP 401: revoked".to_string(),
        };
        assert_eq!(err.to_string(), "token refresh rejected: HTTP 401: revoked");
    }

    #[test]
    fn error_display_storage_corrupt() {
        let err = AuthError::StorageCorrupt {
            reason: "expected value at line 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "persisted session is corrupt: expected value at line 1"
        );
    }

    #[test]
    fn secrets_error_converts() {
        let inner = wingman_secrets::SecretStoreError::Poisoned {
            reason: "x".to_string(),
        };
        let err: AuthError = inner.into();
        assert!(matches!(err, AuthError::Secrets(_)));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthError>();
    }
}
