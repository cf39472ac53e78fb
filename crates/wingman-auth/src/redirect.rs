//! Inbound redirect callback delivery.
//!
//! After the user authorizes in the browser, the identity provider
//! redirects to a URI this application receives — through a loopback HTTP
//! listener in the CLI, or through the editor's URI handler inside an IDE.
//! Whatever surface receives it publishes the parsed query parameters into
//! the [`RedirectHub`]; the login flow subscribes and filters by its
//! correlation state.
//!
//! The hub is intentionally dumb: it carries raw query pairs and performs
//! no validation. Matching, field extraction, and error policy all live
//! with the subscriber.

use std::sync::Arc;

use tokio::sync::broadcast;

/// Default channel capacity for the redirect bus.
const DEFAULT_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Redirect events
// ---------------------------------------------------------------------------

/// The query parameters of one inbound redirect callback.
#[derive(Debug, Clone)]
pub struct RedirectEvent {
    params: Vec<(String, String)>,
}

impl RedirectEvent {
    /// Build an event from already-parsed query pairs.
    pub fn new(params: Vec<(String, String)>) -> Self {
        Self { params }
    }

    /// Parse an event from a raw query string (`a=1&b=two%20words`).
    pub fn from_query(query: &str) -> Self {
        let params = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { params }
    }

    /// The first value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All query pairs in arrival order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

// ---------------------------------------------------------------------------
// Redirect hub
// ---------------------------------------------------------------------------

/// Publish/subscribe hub for inbound redirect callbacks.
///
/// Cheaply cloneable; all clones share the same channel. Publishing with
/// no pending login is normal (a stale browser tab completing late) — the
/// event is dropped.
#[derive(Clone)]
pub struct RedirectHub {
    sender: broadcast::Sender<Arc<RedirectEvent>>,
}

impl RedirectHub {
    /// Create a hub with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self { sender }
    }

    /// Subscribe to future redirect callbacks.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RedirectEvent>> {
        self.sender.subscribe()
    }

    /// Publish a redirect callback to all current subscribers.
    ///
    /// Returns the number of receivers that will observe it.
    pub fn publish(&self, event: RedirectEvent) -> usize {
        match self.sender.send(Arc::new(event)) {
            Ok(n) => {
                tracing::debug!(receivers = n, "redirect callback published");
                n
            }
            Err(_) => {
                tracing::debug!("redirect callback arrived with no pending login; dropped");
                0
            }
        }
    }
}

impl Default for RedirectHub {
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

    #[test]
    fn from_query_parses_pairs() {
        let event = RedirectEvent::from_query("accessToken=a1&refreshToken=r1&name=Ada");
        assert_eq!(event.get("accessToken"), Some("a1"));
        assert_eq!(event.get("refreshToken"), Some("r1"));
        assert_eq!(event.get("name"), Some("Ada"));
        assert_eq!(event.get("email"), None);
    }

    #[test]
    fn from_query_percent_decodes() {
        let event = RedirectEvent::from_query("name=Ada%20Lovelace&email=ada%40x.com");
        assert_eq!(event.get("name"), Some("Ada Lovelace"));
        assert_eq!(event.get("email"), Some("ada@x.com"));
    }

    #[test]
    fn from_query_plus_decodes_to_space() {
        let event = RedirectEvent::from_query("name=Ada+Lovelace");
        assert_eq!(event.get("name"), Some("Ada Lovelace"));
    }

    #[test]
    fn get_returns_first_value_for_duplicate_keys() {
        let event = RedirectEvent::from_query("state=first&state=second");
        assert_eq!(event.get("state"), Some("first"));
    }

    #[test]
    fn empty_query_has_no_params() {
        let event = RedirectEvent::from_query("");
        assert!(event.params().is_empty());
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let hub = RedirectHub::new();
        let mut rx = hub.subscribe();

        hub.publish(RedirectEvent::from_query("state=xyz"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.get("state"), Some("xyz"));
    }

    #[tokio::test]
    async fn publish_without_subscribers_drops_event() {
        let hub = RedirectHub::new();
        assert_eq!(hub.publish(RedirectEvent::from_query("state=late")), 0);
    }
}
