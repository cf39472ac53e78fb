//! Proactive token refresh scheduling.
//!
//! The [`RefreshScheduler`] owns at most one outstanding timer task.
//! `arm` replaces any existing timer with a new one that fires at the
//! given absolute time (immediately if already past); `disarm` aborts it.
//! The scheduler is a field of the session manager — armed on login
//! commit, refresh commit, and session discovery; disarmed on logout and
//! refresh failure. It is never process-global state.
//!
//! The scheduler does not know what "refresh" means: the manager hands it
//! a future to run at fire time. That keeps the timer lifecycle testable
//! in isolation.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Owns the single outstanding refresh timer.
#[derive(Default)]
pub struct RefreshScheduler {
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    /// Create a disarmed scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `fut` to run at `fire_at_ms` (Unix-epoch milliseconds),
    /// or immediately if that moment has passed. Any previously armed
    /// timer is cancelled first — exactly one invocation is ever pending.
    pub fn arm<F>(&self, fire_at_ms: i64, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let now = chrono::Utc::now().timestamp_millis();
        let delay = Duration::from_millis(fire_at_ms.saturating_sub(now).max(0) as u64);

        tracing::debug!(fire_at_ms, delay_ms = delay.as_millis() as u64, "refresh timer armed");

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fut.await;
        });

        if let Some(previous) = self.slot().replace(handle) {
            previous.abort();
        }
    }

    /// Cancel any pending timer. A no-op when disarmed.
    pub fn disarm(&self) {
        if let Some(handle) = self.slot().take() {
            handle.abort();
            tracing::debug!("refresh timer disarmed");
        }
    }

    /// Whether a timer is currently pending (armed and not yet fired).
    pub fn is_armed(&self) -> bool {
        self.slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        // The slot only holds a handle; recover the guard on poison.
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.disarm();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    #[tokio::test]
    async fn past_fire_time_runs_immediately() {
        let scheduler = RefreshScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        scheduler.arm(now_ms() - 1_000, async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_armed());
    }

    #[tokio::test]
    async fn rearming_replaces_the_pending_timer() {
        let scheduler = RefreshScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        // First timer would fire quickly; the second pre-empts it with a
        // fire time far in the future.
        let counter = Arc::clone(&fired);
        scheduler.arm(now_ms() + 20, async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let counter = Arc::clone(&fired);
        scheduler.arm(now_ms() + 60_000, async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(scheduler.is_armed());
    }

    #[tokio::test]
    async fn disarm_cancels_the_pending_timer() {
        let scheduler = RefreshScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        scheduler.arm(now_ms() + 20, async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.disarm();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!scheduler.is_armed());
    }

    #[tokio::test]
    async fn disarm_when_not_armed_is_noop() {
        let scheduler = RefreshScheduler::new();
        scheduler.disarm();
        assert!(!scheduler.is_armed());
    }

    #[tokio::test]
    async fn timer_fires_once_at_the_scheduled_time() {
        let scheduler = RefreshScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        scheduler.arm(now_ms() + 30, async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(scheduler.is_armed());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
