//! Keep-alive resends
//!
//! Intermediate proxies close multipart responses that go quiet. When the
//! current frame is older than the keep-alive threshold it is broadcast
//! again, whether or not the source is actually stalled. The upstream
//! connection is never touched from here.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::registry::{Broadcaster, Frame, FrameStore};
use crate::stats::RelayStats;

/// Periodically re-sends the last frame to idle viewers
pub struct KeepAliveTicker {
    store: Arc<FrameStore>,
    broadcaster: Arc<Broadcaster>,
    stats: Arc<RelayStats>,
    interval: Duration,
    threshold: Duration,
}

impl KeepAliveTicker {
    /// Create a ticker
    pub fn new(
        store: Arc<FrameStore>,
        broadcaster: Arc<Broadcaster>,
        stats: Arc<RelayStats>,
        interval: Duration,
        threshold: Duration,
    ) -> Self {
        Self {
            store,
            broadcaster,
            stats,
            interval,
            threshold,
        }
    }

    /// The frame to re-send at `now`, if the current one has gone stale
    pub fn due(&self, now: Instant) -> Option<Frame> {
        self.store
            .get()
            .filter(|frame| frame.age_at(now) > self.threshold)
    }

    /// Tick until shutdown
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some(frame) = self.due(Instant::now()) {
                        let report = self.broadcaster.broadcast(&frame).await;
                        if !report.stale {
                            self.stats.record_keepalive();
                        }
                    }
                }
            }
        }
    }
}
