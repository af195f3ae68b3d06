//! Frame fan-out
//!
//! Wraps a frame in the multipart wire format once and hands the same
//! `Bytes` to every registered viewer. Each viewer is an isolated unit of
//! failure: a rejected delivery unregisters that viewer only.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::clients::ClientRegistry;
use super::frame::{ClientId, Frame};
use super::sink::Delivery;
use crate::mjpeg::encode_part;
use crate::stats::RelayStats;

/// Per-call delivery counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Viewers that accepted the part
    pub delivered: usize,
    /// Lagging viewers that skipped this part
    pub skipped: usize,
    /// Viewers removed after a failed delivery
    pub dropped: usize,
    /// Frame was older than one already broadcast and was not sent
    pub stale: bool,
}

/// Pushes frames to every viewer of one camera
pub struct Broadcaster {
    registry: Arc<ClientRegistry>,
    /// Sequence of the newest frame delivered so far
    last_sequence: Mutex<u64>,
    stats: Arc<RelayStats>,
}

impl Broadcaster {
    /// Create a broadcaster over `registry`
    pub fn new(registry: Arc<ClientRegistry>, stats: Arc<RelayStats>) -> Self {
        Self {
            registry,
            last_sequence: Mutex::new(0),
            stats,
        }
    }

    /// The registry this broadcaster delivers to
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Deliver `frame` to all current viewers
    ///
    /// Calls are serialized. A frame older than the last one delivered, or
    /// older than the store's current frame, is ignored so that each viewer
    /// sees non-decreasing sequence numbers; re-sending the same frame is
    /// allowed.
    pub async fn broadcast(&self, frame: &Frame) -> BroadcastReport {
        let mut last = self.last_sequence.lock().await;

        // A late joiner may already hold the store's frame
        let (current, members) = self.registry.snapshot().await;
        if frame.sequence < (*last).max(current) {
            return BroadcastReport {
                stale: true,
                ..Default::default()
            };
        }
        *last = frame.sequence;

        let part = encode_part(&frame.data);
        let mut report = BroadcastReport::default();
        let mut failed: Vec<ClientId> = Vec::new();

        for (id, sink) in members {
            match sink.deliver(part.clone()) {
                Ok(Delivery::Queued) => report.delivered += 1,
                Ok(Delivery::Skipped) => {
                    tracing::trace!(
                        client_id = %id,
                        sequence = frame.sequence,
                        "Client lagging, frame skipped"
                    );
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::debug!(client_id = %id, error = %e, "Delivery failed");
                    failed.push(id);
                }
            }
        }
        // Held until every part is queued; two broadcasts never interleave
        // their deliveries to one viewer.
        drop(last);

        for id in failed {
            if self.registry.unregister(id).await {
                report.dropped += 1;
            }
        }

        self.stats.record_broadcast();
        report
    }
}
