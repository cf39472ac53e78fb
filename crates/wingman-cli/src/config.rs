//! CLI configuration.
//!
//! Settings merge in three layers, later layers winning: built-in
//! defaults, `wingman.toml` (current directory, then `~/.wingman/`), and
//! `WINGMAN_*` environment variables. A `.env` file is honored via
//! `dotenvy` before the environment is read.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use wingman_auth::AuthConfig;

/// Default port for the loopback redirect listener.
pub const DEFAULT_REDIRECT_PORT: u16 = 8377;

/// Config file name searched in the current directory and `~/.wingman/`.
const CONFIG_FILE: &str = "wingman.toml";

/// Layered CLI configuration. Every field is optional; [`CliConfig::auth_config`]
/// fills gaps from [`AuthConfig::default`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// The identity provider's login page.
    pub login_url: Option<String>,

    /// The refresh-token exchange endpoint.
    pub token_url: Option<String>,

    /// Client identifier sent in the login URL.
    pub source: Option<String>,

    /// Port for the loopback redirect listener.
    pub redirect_port: Option<u16>,

    /// Where secrets are persisted. Defaults to `~/.wingman/secrets.json`.
    pub secrets_file: Option<PathBuf>,
}

impl CliConfig {
    /// Load configuration: defaults ← config file ← environment.
    pub fn load() -> Result<Self> {
        // A .env in the working directory is a development convenience;
        // absence is not an error.
        dotenvy::dotenv().ok();

        let mut config = match Self::find_config_file() {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let config = Self::from_toml_str(&contents)
                    .with_context(|| format!("failed to parse {}", path.display()))?;
                tracing::debug!(path = %path.display(), "loaded config file");
                config
            }
            None => Self::default(),
        };

        config.apply_env();
        Ok(config)
    }

    /// Parse a config from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Overlay `WINGMAN_*` environment variables.
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("WINGMAN_LOGIN_URL") {
            self.login_url = Some(v);
        }
        if let Ok(v) = std::env::var("WINGMAN_TOKEN_URL") {
            self.token_url = Some(v);
        }
        if let Ok(v) = std::env::var("WINGMAN_SOURCE") {
            self.source = Some(v);
        }
        if let Ok(v) = std::env::var("WINGMAN_REDIRECT_PORT") {
            match v.parse() {
                Ok(port) => self.redirect_port = Some(port),
                Err(_) => tracing::warn!(value = %v, "ignoring non-numeric WINGMAN_REDIRECT_PORT"),
            }
        }
        if let Ok(v) = std::env::var("WINGMAN_SECRETS_FILE") {
            self.secrets_file = Some(PathBuf::from(v));
        }
    }

    fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        let home = dirs::home_dir()?.join(".wingman").join(CONFIG_FILE);
        home.is_file().then_some(home)
    }

    /// The redirect listener port.
    pub fn redirect_port(&self) -> u16 {
        self.redirect_port.unwrap_or(DEFAULT_REDIRECT_PORT)
    }

    /// Where the secret store lives.
    pub fn secrets_path(&self) -> PathBuf {
        if let Some(ref path) = self.secrets_file {
            return path.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wingman")
            .join("secrets.json")
    }

    /// Build the auth core configuration from this CLI configuration.
    pub fn auth_config(&self) -> AuthConfig {
        let defaults = AuthConfig::default();
        AuthConfig {
            login_url: self.login_url.clone().unwrap_or(defaults.login_url),
            token_url: self.token_url.clone().unwrap_or(defaults.token_url),
            redirect_uri: format!("http://127.0.0.1:{}/callback", self.redirect_port()),
            source: self.source.clone().unwrap_or(defaults.source),
            ..defaults
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_all_defaults() {
        let config = CliConfig::from_toml_str("").unwrap();
        assert!(config.login_url.is_none());
        assert_eq!(config.redirect_port(), DEFAULT_REDIRECT_PORT);
    }

    #[test]
    fn toml_fields_parse() {
        let config = CliConfig::from_toml_str(
            r#"
            login_url = "https://id.example.com/login"
            token_url = "https://id.example.com/token"
            source = "vscode"
            redirect_port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(
            config.login_url.as_deref(),
            Some("https://id.example.com/login")
        );
        assert_eq!(config.redirect_port(), 9000);
        assert_eq!(config.source.as_deref(), Some("vscode"));
    }

    #[test]
    fn unknown_toml_field_is_ignored() {
        // A typo'd key falls back to defaults rather than erroring.
        let config = CliConfig::from_toml_str("login_uri = \"typo\"").unwrap();
        assert!(config.login_url.is_none());
    }

    #[test]
    fn auth_config_overlays_configured_values() {
        let config = CliConfig::from_toml_str(
            r#"
            login_url = "https://id.example.com/login"
            redirect_port = 9000
            "#,
        )
        .unwrap();

        let auth = config.auth_config();
        assert_eq!(auth.login_url, "https://id.example.com/login");
        assert_eq!(auth.redirect_uri, "http://127.0.0.1:9000/callback");
        // Unset fields keep their defaults.
        assert_eq!(auth.token_url, AuthConfig::default().token_url);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(CliConfig::from_toml_str("login_url = [broken").is_err());
    }
}
