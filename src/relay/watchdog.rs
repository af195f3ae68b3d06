//! Stall detection for one connection attempt
//!
//! The watchdog only starts judging once the attempt has produced a frame,
//! so a slow-starting source (or the stale frame left over from the previous
//! attempt) never triggers a spurious cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::registry::FrameStore;

/// Result of one freshness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogVerdict {
    /// No frame yet in this attempt; checks suppressed
    Waiting,
    /// Latest frame is within the stall timeout
    Healthy,
    /// Latest frame is older than the stall timeout
    Stalled,
}

/// Per-attempt stall detector
pub struct Watchdog {
    store: Arc<FrameStore>,
    /// Store sequence when the attempt began
    baseline: u64,
    interval: Duration,
    stall_timeout: Duration,
}

impl Watchdog {
    /// Create a watchdog for an attempt starting now
    pub fn new(store: Arc<FrameStore>, interval: Duration, stall_timeout: Duration) -> Self {
        let baseline = store.sequence();
        Self {
            store,
            baseline,
            interval,
            stall_timeout,
        }
    }

    /// Judge frame freshness at `now`
    pub fn check(&self, now: Instant) -> WatchdogVerdict {
        match self.store.get() {
            Some(frame) if frame.sequence > self.baseline => {
                if frame.age_at(now) > self.stall_timeout {
                    WatchdogVerdict::Stalled
                } else {
                    WatchdogVerdict::Healthy
                }
            }
            _ => WatchdogVerdict::Waiting,
        }
    }

    /// Tick until the attempt ends or stalls
    ///
    /// On a stall the attempt token is cancelled and `true` is returned. If
    /// the token is cancelled by someone else first, returns `false`.
    pub async fn run(self, attempt: CancellationToken) -> bool {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = attempt.cancelled() => return false,
                _ = ticker.tick() => {
                    if self.check(Instant::now()) == WatchdogVerdict::Stalled {
                        attempt.cancel();
                        return true;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    const INTERVAL: Duration = Duration::from_millis(250);
    const STALL: Duration = Duration::from_millis(5000);

    #[tokio::test(start_paused = true)]
    async fn test_suppressed_before_first_frame() {
        let store = Arc::new(FrameStore::new());
        let watchdog = Watchdog::new(Arc::clone(&store), INTERVAL, STALL);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(watchdog.check(Instant::now()), WatchdogVerdict::Waiting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_previous_attempt_frame_ignored() {
        let store = Arc::new(FrameStore::new());
        store.publish(Bytes::from_static(b"old"));
        tokio::time::advance(Duration::from_secs(30)).await;

        let watchdog = Watchdog::new(Arc::clone(&store), INTERVAL, STALL);
        assert_eq!(watchdog.check(Instant::now()), WatchdogVerdict::Waiting);

        store.publish(Bytes::from_static(b"new"));
        assert_eq!(watchdog.check(Instant::now()), WatchdogVerdict::Healthy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stall_detected() {
        let store = Arc::new(FrameStore::new());
        let watchdog = Watchdog::new(Arc::clone(&store), INTERVAL, STALL);
        store.publish(Bytes::from_static(b"frame"));

        tokio::time::advance(Duration::from_millis(4900)).await;
        assert_eq!(watchdog.check(Instant::now()), WatchdogVerdict::Healthy);

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(watchdog.check(Instant::now()), WatchdogVerdict::Stalled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cancels_stalled_attempt() {
        let store = Arc::new(FrameStore::new());
        let watchdog = Watchdog::new(Arc::clone(&store), INTERVAL, STALL);
        store.publish(Bytes::from_static(b"frame"));

        let attempt = CancellationToken::new();
        let started = Instant::now();
        let stalled = watchdog.run(attempt.clone()).await;

        assert!(stalled);
        assert!(attempt.is_cancelled());
        let waited = started.elapsed();
        assert!(waited > STALL);
        assert!(waited <= STALL + INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exits_when_attempt_ends() {
        let store = Arc::new(FrameStore::new());
        let watchdog = Watchdog::new(Arc::clone(&store), INTERVAL, STALL);

        let attempt = CancellationToken::new();
        let handle = tokio::spawn(watchdog.run(attempt.clone()));
        tokio::time::advance(Duration::from_secs(1)).await;
        attempt.cancel();

        assert!(!handle.await.unwrap());
    }
}
