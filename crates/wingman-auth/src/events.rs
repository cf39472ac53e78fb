//! Session-change notification bus.
//!
//! Subscribers (UI surfaces, CLI status displays) observe session
//! lifecycle transitions as [`SessionChange`] batches published through
//! [`SessionEvents`], a thin wrapper over [`tokio::sync::broadcast`].
//! Events are wrapped in [`Arc`] so broadcasting to multiple subscribers
//! does not clone the payload.
//!
//! Ordering invariant: the manager emits a change strictly *after* the
//! corresponding durable mutation — `added` after the session is
//! persisted, `removed` after it is deleted — so subscribers never observe
//! an event referring to uncommitted state.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::session::Session;

/// Default channel capacity for the session-change bus.
const DEFAULT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Change batches
// ---------------------------------------------------------------------------

/// A batch of session lifecycle transitions.
///
/// Exactly one list is non-empty for every event the manager emits, but
/// subscribers should handle arbitrary combinations.
#[derive(Debug, Clone, Default)]
pub struct SessionChange {
    /// Sessions created by a successful login.
    pub added: Vec<Session>,
    /// Sessions destroyed by logout or unrecoverable refresh failure.
    pub removed: Vec<Session>,
    /// Sessions whose tokens were rotated by a successful refresh.
    pub changed: Vec<Session>,
}

impl SessionChange {
    /// A batch announcing one newly created session.
    pub fn added(session: Session) -> Self {
        Self {
            added: vec![session],
            ..Self::default()
        }
    }

    /// A batch announcing one destroyed session.
    pub fn removed(session: Session) -> Self {
        Self {
            removed: vec![session],
            ..Self::default()
        }
    }

    /// A batch announcing one refreshed session.
    pub fn changed(session: Session) -> Self {
        Self {
            changed: vec![session],
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Event bus
// ---------------------------------------------------------------------------

/// Publish/subscribe bus for [`SessionChange`] batches.
///
/// Cheaply cloneable; all clones share the same channel.
#[derive(Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<Arc<SessionChange>>,
}

impl SessionEvents {
    /// Create a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with the given channel capacity.
    ///
    /// A subscriber that falls behind by more than `capacity` events
    /// receives a `Lagged` error indicating how many it missed.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to future session changes.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SessionChange>> {
        self.sender.subscribe()
    }

    /// Publish a change batch to all current subscribers.
    ///
    /// Returns the number of receivers that will observe it. No active
    /// subscribers is normal (e.g. a headless refresh) and not an error.
    pub fn emit(&self, change: SessionChange) -> usize {
        match self.sender.send(Arc::new(change)) {
            Ok(n) => {
                tracing::trace!(receivers = n, "session change emitted");
                n
            }
            Err(_) => {
                tracing::trace!("session change emitted with no active subscribers");
                0
            }
        }
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Account;

    fn test_session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_at_ms: 0,
            account: Account {
                label: "Ada".to_string(),
                id: "ada@x.com".to_string(),
            },
            scopes: vec![],
        }
    }

    #[tokio::test]
    async fn subscriber_receives_emitted_change() {
        let events = SessionEvents::new();
        let mut rx = events.subscribe();

        events.emit(SessionChange::added(test_session("s1")));

        let change = rx.recv().await.unwrap();
        assert_eq!(change.added.len(), 1);
        assert_eq!(change.added[0].id, "s1");
        assert!(change.removed.is_empty());
        assert!(change.changed.is_empty());
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_ok() {
        let events = SessionEvents::new();
        assert_eq!(events.emit(SessionChange::removed(test_session("s1"))), 0);
    }

    #[tokio::test]
    async fn all_subscribers_see_every_event() {
        let events = SessionEvents::new();
        let mut rx1 = events.subscribe();
        let mut rx2 = events.subscribe();

        events.emit(SessionChange::changed(test_session("s1")));

        assert_eq!(rx1.recv().await.unwrap().changed[0].id, "s1");
        assert_eq!(rx2.recv().await.unwrap().changed[0].id, "s1");
    }

    #[test]
    fn constructors_fill_only_their_list() {
        let s = test_session("x");
        assert_eq!(SessionChange::added(s.clone()).added.len(), 1);
        assert_eq!(SessionChange::removed(s.clone()).removed.len(), 1);
        assert_eq!(SessionChange::changed(s).changed.len(), 1);
    }
}
