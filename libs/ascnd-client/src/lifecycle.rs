//! Open/closed lifecycle shared by every call on a client
//!
//! A single `AtomicBool` decides which caller performs teardown. Calls that
//! raced past the open check are tracked so a graceful shutdown can wait for
//! them, and are aborted through the shutdown token once teardown runs.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::{AscndError, Result};

#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    closed: AtomicBool,
    abort: CancellationToken,
    in_flight: AtomicUsize,
    drained: Notify,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Flip Open→Closed. Returns true for exactly one caller.
    pub(crate) fn begin_close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Register a call, failing fast once the client is closed.
    pub(crate) fn enter(&self) -> Result<InFlight<'_>> {
        if self.is_closed() {
            return Err(AscndError::Closed);
        }
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        Ok(InFlight { lifecycle: self })
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Resolves once teardown has aborted outstanding calls.
    pub(crate) fn aborted(&self) -> WaitForCancellationFuture<'_> {
        self.abort.cancelled()
    }

    pub(crate) fn abort_in_flight(&self) {
        self.abort.cancel();
    }

    /// Wait until no call is in flight or `deadline` passes.
    ///
    /// Returns whether the client drained in time.
    pub(crate) async fn wait_drained(&self, deadline: Instant) -> bool {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return true;
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(deadline) => return self.in_flight() == 0,
            }
        }
    }
}

/// Guard held for the duration of one call
pub(crate) struct InFlight<'a> {
    lifecycle: &'a Lifecycle,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.lifecycle.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.lifecycle.drained.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_only_first_close_wins() {
        let lifecycle = Lifecycle::new();

        assert!(lifecycle.begin_close());
        assert!(!lifecycle.begin_close());
        assert!(!lifecycle.begin_close());
        assert!(lifecycle.is_closed());
    }

    #[test]
    fn test_enter_after_close_fails() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_close();

        assert!(matches!(lifecycle.enter(), Err(AscndError::Closed)));
        assert_eq!(lifecycle.in_flight(), 0);
    }

    #[test]
    fn test_guard_tracks_in_flight() {
        let lifecycle = Lifecycle::new();

        let first = lifecycle.enter().unwrap();
        let second = lifecycle.enter().unwrap();
        assert_eq!(lifecycle.in_flight(), 2);

        drop(first);
        assert_eq!(lifecycle.in_flight(), 1);
        drop(second);
        assert_eq!(lifecycle.in_flight(), 0);
    }

    #[test]
    fn test_concurrent_close_has_single_winner() {
        let lifecycle = Arc::new(Lifecycle::new());

        let winners: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..32)
                .map(|_| {
                    let lifecycle = Arc::clone(&lifecycle);
                    scope.spawn(move || lifecycle.begin_close() as usize)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_wait_drained_returns_when_last_call_finishes() {
        let lifecycle = Arc::new(Lifecycle::new());
        let guard_owner = Arc::clone(&lifecycle);

        let (entered_tx, entered_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let call = tokio::spawn(async move {
            let _guard = guard_owner.enter().unwrap();
            entered_tx.send(()).unwrap();
            release_rx.await.ok();
        });

        entered_rx.await.unwrap();
        let waiter = {
            let lifecycle = Arc::clone(&lifecycle);
            tokio::spawn(async move {
                lifecycle
                    .wait_drained(Instant::now() + Duration::from_secs(5))
                    .await
            })
        };

        release_tx.send(()).unwrap();
        call.await.unwrap();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_drained_gives_up_at_deadline() {
        let lifecycle = Lifecycle::new();
        let _stuck = lifecycle.enter().unwrap();

        let drained = lifecycle
            .wait_drained(Instant::now() + Duration::from_millis(50))
            .await;

        assert!(!drained);
    }

    #[tokio::test]
    async fn test_abort_resolves_waiters() {
        let lifecycle = Lifecycle::new();
        lifecycle.abort_in_flight();

        tokio::time::timeout(Duration::from_secs(1), lifecycle.aborted())
            .await
            .unwrap();
    }
}
