//! External browser launching.
//!
//! The login flow hands the authorize URL to a [`BrowserLauncher`]. The
//! production implementation shells out to the platform opener via the
//! `open` crate; tests substitute a recorder so no browser ever appears.

use crate::error::{AuthError, Result};

/// Opens a URL in the user's default browser.
pub trait BrowserLauncher: Send + Sync {
    /// Open `url` externally.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::BrowserLaunch`] if the platform opener fails.
    /// A launched tab can never be retracted — cancellation of the login
    /// flow only stops the application from waiting on it.
    fn open(&self, url: &str) -> Result<()>;
}

/// [`BrowserLauncher`] backed by the platform's default opener.
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        tracing::info!(url = %url, "opening browser for login");
        open::that_detached(url).map_err(|e| AuthError::BrowserLaunch {
            reason: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_browser_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SystemBrowser>();
    }
}
