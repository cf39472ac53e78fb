//! Auth core configuration.
//!
//! [`AuthConfig`] carries the identity-provider endpoints and the timing
//! constants of the session lifecycle. `Default` matches the hosted
//! Wingman control plane; the CLI overrides fields from its config file
//! and environment.

use std::time::Duration;

/// How long a freshly issued access token is considered valid.
///
/// The token endpoint does not report an expiry; the client stamps each
/// session with `now + EXPIRATION_WINDOW` and refreshes proactively at
/// that horizon.
pub const EXPIRATION_WINDOW: Duration = Duration::from_secs(4 * 3600 + 30 * 60);

/// How long a login waits for the browser redirect before failing.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Bounded timeout for token endpoint HTTP calls.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the auth session manager.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// The identity provider's login page, opened in the browser.
    pub login_url: String,

    /// The endpoint that exchanges a refresh token for new tokens.
    pub token_url: String,

    /// Where the provider redirects after authorization.
    pub redirect_uri: String,

    /// Client identifier sent as the `source` query parameter.
    pub source: String,

    /// Validity window stamped onto new and refreshed sessions.
    pub expiration_window: Duration,

    /// How long `login` waits on the redirect race.
    pub login_timeout: Duration,

    /// Timeout applied to token endpoint HTTP calls.
    pub http_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_url: "https://app.wingman.dev/login".to_string(),
            token_url: "https://api.wingman.dev/v1/access-token".to_string(),
            redirect_uri: "http://127.0.0.1:8377/callback".to_string(),
            source: "cli".to_string(),
            expiration_window: EXPIRATION_WINDOW,
            login_timeout: LOGIN_TIMEOUT,
            http_timeout: HTTP_TIMEOUT,
        }
    }
}

impl AuthConfig {
    /// The absolute expiry timestamp for a session minted right now.
    pub fn expires_at_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() + self.expiration_window.as_millis() as i64
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_windows() {
        let config = AuthConfig::default();
        assert_eq!(config.expiration_window, Duration::from_secs(16_200));
        assert_eq!(config.login_timeout, Duration::from_secs(900));
    }

    #[test]
    fn expires_at_ms_is_in_the_future() {
        let config = AuthConfig::default();
        let now = chrono::Utc::now().timestamp_millis();
        let expires = config.expires_at_ms();
        assert!(expires > now);
        assert!(expires <= now + config.expiration_window.as_millis() as i64 + 1_000);
    }
}
