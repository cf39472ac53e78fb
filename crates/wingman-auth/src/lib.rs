//! Authentication session core for Wingman.
//!
//! This crate manages the single signed-in account of the Wingman IDE
//! companion: it drives the external-browser login flow, persists the
//! resulting session through a pluggable secret store, and keeps the
//! access token valid with a scheduled, cancellable refresh — across
//! process restarts, user cancellation, and network failure, without ever
//! leaving a corrupted or duplicated session behind.
//!
//! # Architecture
//!
//! ```text
//! AuthSessionManager
//! ├── PendingExchangeRegistry  (one in-flight login per scope set)
//! ├── RedirectHub              (inbound callback pub/sub)
//! ├── BrowserLauncher          (opens the login URL externally)
//! ├── TokenEndpoint            (refresh-token exchange over HTTP)
//! ├── RefreshScheduler         (single proactive refresh timer)
//! ├── SessionStore             (single-slot persistence via SecretStore)
//! └── SessionEvents            (added/removed/changed broadcast)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use wingman_auth::{
//!     AuthConfig, AuthSessionManager, HttpTokenEndpoint, RedirectHub, SystemBrowser,
//! };
//! use wingman_secrets::FileSecretStore;
//!
//! # async fn example() -> wingman_auth::Result<()> {
//! let config = AuthConfig::default();
//! let redirects = RedirectHub::new();
//!
//! let manager = AuthSessionManager::new(
//!     config.clone(),
//!     Arc::new(FileSecretStore::new("data/secrets.json")),
//!     Arc::new(HttpTokenEndpoint::new(&config)?),
//!     Arc::new(SystemBrowser),
//!     redirects.clone(),
//! );
//!
//! // Something must feed browser redirects into `redirects` — the CLI
//! // runs a loopback listener; an IDE wires up its URI handler.
//! let session = manager.login(&[]).await?;
//! println!("signed in as {}", session.account.label);
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod pending;
pub mod redirect;
pub mod refresh;
pub mod session;
pub mod token_client;

// Re-export key types at the crate root for convenience.
pub use browser::{BrowserLauncher, SystemBrowser};
pub use config::AuthConfig;
pub use error::{AuthError, Result};
pub use events::{SessionChange, SessionEvents};
pub use manager::AuthSessionManager;
pub use pending::{PendingExchange, PendingExchangeRegistry, RedirectCredentials};
pub use redirect::{RedirectEvent, RedirectHub};
pub use refresh::RefreshScheduler;
pub use session::{Account, SESSION_SECRET_KEY, Session, SessionStore, scope_key};
pub use token_client::{HttpTokenEndpoint, TokenEndpoint, TokenGrant};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_available() {
        let _config = AuthConfig::default();
        let _hub = RedirectHub::new();
        let _events = SessionEvents::new();
        let _registry = PendingExchangeRegistry::new();
    }
}
