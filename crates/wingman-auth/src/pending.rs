//! Pending login exchange correlation.
//!
//! Each login attempt owns a [`PendingExchange`]: a random correlation
//! state embedded in the outbound login URL, a completion slot the
//! matching redirect eventually fills, and a cancellation token that
//! unblocks every waiter. The [`PendingExchangeRegistry`] keys exchanges
//! by scope key so concurrent `login` calls with the same scope set join
//! one flow — one browser launch, one redirect listener — while calls with
//! different scope sets proceed fully in parallel.
//!
//! Resolution is first-wins: whichever of redirect success, cancellation,
//! or timeout lands first is written into the completion slot, and every
//! waiter observes that same outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::rand::{SecureRandom, SystemRandom};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{AuthError, Result};

/// Length of the correlation state in random bytes (before base64 encoding).
const STATE_BYTES: usize = 32;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// The credential fields extracted from a successful redirect callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectCredentials {
    /// Short-lived bearer token.
    pub access_token: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Display name reported by the identity provider.
    pub name: String,
    /// Stable account identity (email).
    pub email: String,
}

/// Why an exchange resolved without credentials.
///
/// Kept separate from [`AuthError`] so one outcome can fan out to every
/// waiter by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// The user cancelled before the redirect arrived.
    Cancelled,
    /// The login window elapsed.
    TimedOut,
    /// The redirect arrived but lacked a required field.
    MissingField(String),
}

impl From<ExchangeError> for AuthError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::Cancelled => AuthError::UserCancelled,
            ExchangeError::TimedOut => AuthError::LoginTimedOut,
            ExchangeError::MissingField(field) => AuthError::MissingCredentialField { field },
        }
    }
}

/// How one exchange resolved.
pub type ExchangeOutcome = std::result::Result<RedirectCredentials, ExchangeError>;

// ---------------------------------------------------------------------------
// PendingExchange
// ---------------------------------------------------------------------------

/// One in-flight login attempt, shared by every caller waiting on it.
pub struct PendingExchange {
    /// The dedup key this exchange is registered under.
    pub scope_key: String,

    /// Random unguessable token embedded in the login URL; the redirect
    /// must echo it back exactly for its credentials to be accepted.
    pub state: String,

    /// Unblocks every waiter; fired on explicit cancellation and again on
    /// release so no waiter can outlive the exchange.
    pub cancel: CancellationToken,

    outcome: watch::Sender<Option<ExchangeOutcome>>,
}

impl PendingExchange {
    fn new(scope_key: String, state: String) -> Arc<Self> {
        let (outcome, _) = watch::channel(None);
        Arc::new(Self {
            scope_key,
            state,
            cancel: CancellationToken::new(),
            outcome,
        })
    }

    /// Resolve the exchange. The first resolution wins; later calls are
    /// no-ops. Returns whether this call was the one that resolved it.
    pub fn complete(&self, outcome: ExchangeOutcome) -> bool {
        self.outcome.send_if_modified(move |slot| {
            if slot.is_none() {
                *slot = Some(outcome);
                true
            } else {
                false
            }
        })
    }

    /// Wait until the exchange resolves and return its outcome.
    pub async fn wait(&self) -> ExchangeOutcome {
        let mut rx = self.outcome.subscribe();
        loop {
            {
                let current = rx.borrow();
                if let Some(outcome) = current.as_ref() {
                    return outcome.clone();
                }
            }
            if rx.changed().await.is_err() {
                // Sender dropped without resolving; only reachable if the
                // exchange itself is gone, which cancellation precedes.
                return Err(ExchangeError::Cancelled);
            }
        }
    }

    /// The outcome, if the exchange has already resolved.
    pub fn outcome(&self) -> Option<ExchangeOutcome> {
        self.outcome.borrow().clone()
    }
}

/// Generate a fresh correlation state: 32 CSPRNG bytes, base64url, no pad.
fn generate_state() -> Result<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; STATE_BYTES];
    rng.fill(&mut bytes).map_err(|_| AuthError::FlowFailed {
        reason: "failed to generate correlation state: CSPRNG error".to_string(),
    })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Correlates at most one in-flight login per scope key.
#[derive(Default)]
pub struct PendingExchangeRegistry {
    entries: Mutex<HashMap<String, Arc<PendingExchange>>>,
}

impl PendingExchangeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the exchange for `scope_key`, creating and registering one
    /// if none exists. The boolean is `true` when this call created it —
    /// only that caller launches the browser and registers the redirect
    /// listener.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::FlowFailed`] if the CSPRNG fails while
    /// generating a correlation state.
    pub fn acquire(&self, scope_key: &str) -> Result<(Arc<PendingExchange>, bool)> {
        let mut entries = self.lock();

        if let Some(existing) = entries.get(scope_key) {
            tracing::debug!(scope_key = %scope_key, "joining existing login exchange");
            return Ok((Arc::clone(existing), false));
        }

        let state = generate_state()?;
        let exchange = PendingExchange::new(scope_key.to_string(), state);
        entries.insert(scope_key.to_string(), Arc::clone(&exchange));

        tracing::debug!(scope_key = %scope_key, "registered new login exchange");
        Ok((exchange, true))
    }

    /// Remove the exchange for `scope_key` and fire its cancel token.
    ///
    /// Idempotent: every waiter calls this in its cleanup path, the first
    /// removal wins, and later calls find nothing. A failed or cancelled
    /// flow therefore never leaves an entry that would block future
    /// logins for this scope set.
    pub fn release(&self, scope_key: &str) {
        let removed = self.lock().remove(scope_key);
        if let Some(exchange) = removed {
            exchange.cancel.cancel();
            tracing::debug!(scope_key = %scope_key, "released login exchange");
        }
    }

    /// The exchange currently registered for `scope_key`, if any.
    pub fn get(&self, scope_key: &str) -> Option<Arc<PendingExchange>> {
        self.lock().get(scope_key).cloned()
    }

    /// Number of in-flight exchanges.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no exchange is in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<PendingExchange>>> {
        // A poisoned registry still holds valid entries; recover the guard.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
