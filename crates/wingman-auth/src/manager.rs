//! High-level authentication session manager.
//!
//! The [`AuthSessionManager`] is the public surface of the auth core and
//! the sole mutator of the session store. It drives the browser login
//! flow end-to-end, keeps the access token fresh via the refresh
//! scheduler, and announces every lifecycle transition on the
//! session-change bus.
//!
//! Concurrency model: one async commit mutex serializes every mutation
//! (login commit, refresh commit/drop, removal). The refresh network call
//! runs outside the mutex; its commit section re-checks that the session
//! it read is still the live one, so a racing logout wins cleanly.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use url::Url;

use wingman_secrets::SecretStore;

use crate::browser::BrowserLauncher;
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::events::{SessionChange, SessionEvents};
use crate::pending::{
    ExchangeError, ExchangeOutcome, PendingExchange, PendingExchangeRegistry, RedirectCredentials,
};
use crate::redirect::{RedirectEvent, RedirectHub};
use crate::refresh::RefreshScheduler;
use crate::session::{Account, Session, SessionStore, canonical_scopes, scope_key};
use crate::token_client::TokenEndpoint;

// ---------------------------------------------------------------------------
// AuthSessionManager
// ---------------------------------------------------------------------------

/// Orchestrates login, session persistence, and scheduled refresh.
///
/// Cheaply cloneable; all clones share the same state. Dropping every
/// clone disarms the refresh timer (the timer task holds only a weak
/// reference back to the manager).
#[derive(Clone)]
pub struct AuthSessionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: AuthConfig,
    store: SessionStore,
    token_endpoint: Arc<dyn TokenEndpoint>,
    browser: Arc<dyn BrowserLauncher>,
    redirects: RedirectHub,
    registry: PendingExchangeRegistry,
    events: SessionEvents,
    scheduler: RefreshScheduler,
    /// Serializes all session mutations.
    commit: tokio::sync::Mutex<()>,
}

impl AuthSessionManager {
    /// Create a manager from its collaborators.
    pub fn new(
        config: AuthConfig,
        secrets: Arc<dyn SecretStore>,
        token_endpoint: Arc<dyn TokenEndpoint>,
        browser: Arc<dyn BrowserLauncher>,
        redirects: RedirectHub,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                config,
                store: SessionStore::new(secrets),
                token_endpoint,
                browser,
                redirects,
                registry: PendingExchangeRegistry::new(),
                events: SessionEvents::new(),
                scheduler: RefreshScheduler::new(),
                commit: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Subscribe to session lifecycle changes.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SessionChange>> {
        self.inner.events.subscribe()
    }

    /// Perform a browser login for `scopes` and return the new session.
    ///
    /// Concurrent calls with the same scope set join one flow: exactly one
    /// browser launch and one redirect listener exist per scope key, and
    /// every caller resolves with the same outcome. Calls with different
    /// scope sets proceed in parallel; the single-session invariant is
    /// enforced at commit time.
    ///
    /// The call resolves with the first of three outcomes: the matching
    /// redirect arrives (success), [`cancel_login`](Self::cancel_login)
    /// fires ([`AuthError::UserCancelled`]), or the login window elapses
    /// ([`AuthError::LoginTimedOut`]).
    ///
    /// # Errors
    ///
    /// Besides the race outcomes above: [`AuthError::BrowserLaunch`] if
    /// the browser cannot be opened,
    /// [`AuthError::MissingCredentialField`] if the redirect lacks a
    /// required parameter, and storage errors from the commit.
    pub async fn login(&self, scopes: &[String]) -> Result<Session> {
        let scopes = canonical_scopes(scopes);
        let key = scope_key(&scopes);

        // Step 1: acquire (or join) the pending exchange for this scope set.
        let (exchange, is_new) = self.inner.registry.acquire(&key)?;

        // Step 2: only the creating caller launches the browser and
        // registers the redirect listener.
        let listener = if is_new {
            match self.inner.start_flow(&exchange, &scopes) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    self.inner.registry.release(&key);
                    return Err(e);
                }
            }
        } else {
            None
        };

        // Step 3: wait on the 3-way race.
        let outcome = self.inner.await_outcome(&exchange).await;

        // Step 4: propagate this resolution to every other waiter, then
        // clean up unconditionally: the listener is aborted so a late
        // redirect is ignored, and the registry entry is released so the
        // next login starts a fresh flow.
        exchange.complete(outcome.clone());
        if let Some(handle) = listener {
            handle.abort();
        }
        self.inner.registry.release(&key);

        // Step 5: commit the session.
        let credentials = outcome.map_err(AuthError::from)?;
        self.inner.commit_login(credentials, scopes).await
    }

    /// Cancel the in-flight login for `scopes`, if any.
    ///
    /// Cooperative: unblocks every waiting caller with
    /// [`AuthError::UserCancelled`] and releases the pending exchange, but
    /// cannot retract an already-opened browser tab.
    pub fn cancel_login(&self, scopes: &[String]) {
        let key = scope_key(scopes);
        if let Some(exchange) = self.inner.registry.get(&key) {
            tracing::info!(scope_key = %key, "cancelling in-flight login");
            exchange.cancel.cancel();
        }
    }

    /// The currently persisted session, or `None`.
    ///
    /// Re-reads the secret store (the source of truth) so a cold restart
    /// sees whatever the previous process persisted, and re-arms the
    /// refresh scheduler against the session's expiry so the refresh
    /// cadence resumes instead of letting the token silently expire. A
    /// corrupt persisted payload is discarded and reported as `None`.
    pub async fn get_session(&self) -> Result<Option<Session>> {
        let session = self.inner.load_or_none()?;
        if let Some(ref session) = session {
            self.inner.arm_refresh(session.expires_at_ms);
        }
        Ok(session)
    }

    /// Remove the session with the given id, if it is the live one.
    ///
    /// Idempotent: an unknown id is a no-op. On removal the refresh
    /// scheduler is disarmed and a `removed` event is emitted after the
    /// deletion is durable.
    pub async fn remove_session(&self, id: &str) -> Result<()> {
        let inner = &self.inner;
        let _commit = inner.commit.lock().await;

        match inner.load_or_none()? {
            Some(session) if session.id == id => {
                inner.store.delete()?;
                inner.scheduler.disarm();
                inner.events.emit(SessionChange::removed(session));
                tracing::info!(session_id = %id, "session removed");
            }
            _ => {
                tracing::debug!(session_id = %id, "remove_session found no matching session");
            }
        }
        Ok(())
    }

    /// Refresh the current session's tokens immediately.
    ///
    /// On success the session is updated in place (same id and account,
    /// new tokens and expiry) and the scheduler is re-armed. On failure
    /// the session is dropped — a rejected refresh token is almost always
    /// revoked, rotated, or expired, so there is no retry loop; the user
    /// must log in again.
    ///
    /// # Errors
    ///
    /// [`AuthError::NoSessionFound`] when nothing is persisted; otherwise
    /// the refresh failure that dropped the session.
    pub async fn refresh_sessions(&self) -> Result<()> {
        self.inner.refresh_sessions().await
    }
}

// ---------------------------------------------------------------------------
// Flow internals
// ---------------------------------------------------------------------------

impl ManagerInner {
    /// Launch the browser and register the state-filtered redirect
    /// listener for a newly created exchange.
    fn start_flow(
        &self,
        exchange: &Arc<PendingExchange>,
        scopes: &[String],
    ) -> Result<JoinHandle<()>> {
        let url = self.login_url(&exchange.state, scopes)?;
        self.browser.open(&url)?;
        Ok(self.spawn_redirect_listener(Arc::clone(exchange)))
    }

    /// Build the identity provider's login URL with the redirect target
    /// and correlation state embedded.
    fn login_url(&self, state: &str, scopes: &[String]) -> Result<String> {
        let mut url = Url::parse(&self.config.login_url)?;

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("redirect_uri", &self.config.redirect_uri);
            params.append_pair("source", &self.config.source);
            params.append_pair("state", state);

            if !scopes.is_empty() {
                params.append_pair("scope", &scopes.join(" "));
            }
        }

        Ok(url.to_string())
    }

    /// Listen for the redirect whose `state` matches this exchange and
    /// resolve it. Events with a different or absent state are not for
    /// this exchange and are ignored.
    fn spawn_redirect_listener(&self, exchange: Arc<PendingExchange>) -> JoinHandle<()> {
        let mut rx = self.redirects.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if event.get("state") != Some(exchange.state.as_str()) {
                            tracing::debug!("redirect state mismatch; ignoring callback");
                            continue;
                        }
                        exchange.complete(extract_credentials(&event));
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "redirect listener lagged behind the hub");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// The 3-way race: redirect outcome, explicit cancellation, timeout.
    ///
    /// `biased` so that an already-resolved exchange always beats the
    /// cancel token that release fires afterwards — every waiter that
    /// joined the same exchange reports the same outcome.
    async fn await_outcome(&self, exchange: &PendingExchange) -> ExchangeOutcome {
        tokio::select! {
            biased;
            outcome = exchange.wait() => outcome,
            _ = exchange.cancel.cancelled() => Err(ExchangeError::Cancelled),
            _ = tokio::time::sleep(self.config.login_timeout) => Err(ExchangeError::TimedOut),
        }
    }

    /// Persist the session produced by a successful exchange and arm the
    /// refresh scheduler. Every waiter of a shared exchange lands here;
    /// the first commit wins and the rest return the already-committed
    /// session, so one login produces exactly one session and one `added`
    /// event.
    async fn commit_login(
        self: &Arc<Self>,
        credentials: RedirectCredentials,
        scopes: Vec<String>,
    ) -> Result<Session> {
        let _commit = self.commit.lock().await;

        if let Some(existing) = self.load_or_none()? {
            if existing.access_token == credentials.access_token {
                return Ok(existing);
            }
        }

        let session = Session {
            id: uuid::Uuid::now_v7().to_string(),
            access_token: credentials.access_token,
            refresh_token: credentials.refresh_token,
            expires_at_ms: self.config.expires_at_ms(),
            account: Account {
                label: credentials.name,
                id: credentials.email,
            },
            scopes,
        };

        self.store.save(&session)?;
        self.events.emit(SessionChange::added(session.clone()));
        self.arm_refresh(session.expires_at_ms);

        tracing::info!(
            session_id = %session.id,
            account = %session.account.id,
            "login complete, session created"
        );
        Ok(session)
    }

    /// The refresh path: exchange the refresh token, then commit the
    /// update or drop the session.
    async fn refresh_sessions(self: &Arc<Self>) -> Result<()> {
        let Some(current) = self.load_or_none()? else {
            return Err(AuthError::NoSessionFound);
        };

        match self
            .token_endpoint
            .exchange_refresh_token(&current.refresh_token)
            .await
        {
            Ok(grant) => {
                let _commit = self.commit.lock().await;

                // A logout or a new login may have replaced the session
                // while the exchange was in flight; only commit onto the
                // session we read.
                let Some(live) = self.load_or_none()? else {
                    return Ok(());
                };
                if live.id != current.id {
                    return Ok(());
                }

                let refreshed = Session {
                    access_token: grant.access_token,
                    refresh_token: grant.refresh_token,
                    expires_at_ms: grant.expires_at_ms,
                    ..live
                };
                self.store.save(&refreshed)?;
                self.events.emit(SessionChange::changed(refreshed.clone()));
                self.arm_refresh(refreshed.expires_at_ms);

                tracing::info!(session_id = %refreshed.id, "session tokens refreshed");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed; dropping session");

                let _commit = self.commit.lock().await;
                if let Some(live) = self.load_or_none()? {
                    if live.id == current.id {
                        self.store.delete()?;
                        self.scheduler.disarm();
                        self.events.emit(SessionChange::removed(live));
                    }
                }
                Err(e)
            }
        }
    }

    /// Load the persisted session, discarding a corrupt payload as if no
    /// session existed.
    fn load_or_none(&self) -> Result<Option<Session>> {
        match self.store.load() {
            Ok(session) => Ok(session),
            Err(AuthError::StorageCorrupt { reason }) => {
                tracing::warn!(reason = %reason, "persisted session is corrupt; discarding");
                self.store.delete()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Arm the refresh scheduler to fire at `expires_at_ms`. The timer
    /// task holds a weak reference so an armed timer never keeps a
    /// dropped manager alive.
    ///
    /// When called from the scheduled-refresh task itself, re-arming (or
    /// disarming) aborts that task's own join handle; the abort lands at
    /// the next yield point, so nothing on that path may await afterwards.
    fn arm_refresh(self: &Arc<Self>, expires_at_ms: i64) {
        let weak = Arc::downgrade(self);
        self.scheduler.arm(expires_at_ms, async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // No caller is waiting on a scheduled refresh; a failure is
            // observable only through the `removed` event it emits.
            if let Err(e) = inner.refresh_sessions().await {
                tracing::debug!(error = %e, "scheduled refresh did not complete");
            }
        });
    }
}

/// Extract the required credential fields from a matched redirect.
fn extract_credentials(event: &RedirectEvent) -> ExchangeOutcome {
    let field = |name: &str| -> std::result::Result<String, ExchangeError> {
        event
            .get(name)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ExchangeError::MissingField(name.to_string()))
    };

    Ok(RedirectCredentials {
        access_token: field("accessToken")?,
        refresh_token: field("refreshToken")?,
        name: field("name")?,
        email: field("email")?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn event(query: &str) -> RedirectEvent {
        RedirectEvent::from_query(query)
    }

    #[test]
    fn extract_credentials_with_all_fields() {
        let outcome = extract_credentials(&event(
            "accessToken=a1&refreshToken=r1&name=Ada&email=ada%40x.com&state=s",
        ));

        let credentials = outcome.unwrap();
        assert_eq!(credentials.access_token, "a1");
        assert_eq!(credentials.refresh_token, "r1");
        assert_eq!(credentials.name, "Ada");
        assert_eq!(credentials.email, "ada@x.com");
    }

    #[test]
    fn extract_credentials_missing_access_token() {
        let outcome = extract_credentials(&event("refreshToken=r1&name=Ada&email=e"));
        assert_eq!(
            outcome,
            Err(ExchangeError::MissingField("accessToken".to_string()))
        );
    }

    #[test]
    fn extract_credentials_missing_user_details() {
        let outcome = extract_credentials(&event("accessToken=a1&refreshToken=r1&name=Ada"));
        assert_eq!(outcome, Err(ExchangeError::MissingField("email".to_string())));
    }

    #[test]
    fn extract_credentials_empty_value_counts_as_missing() {
        let outcome = extract_credentials(&event("accessToken=&refreshToken=r1&name=n&email=e"));
        assert_eq!(
            outcome,
            Err(ExchangeError::MissingField("accessToken".to_string()))
        );
    }
}
