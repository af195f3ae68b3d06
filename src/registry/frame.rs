//! Frame types for fan-out
//!
//! A [`Frame`] is one complete JPEG image cut out of the upstream byte
//! stream, stamped with the monotonic time it was completed.

use bytes::Bytes;
use tokio::time::Instant;

/// One complete JPEG image
///
/// This is designed to be cheap to clone due to `Bytes` reference counting.
#[derive(Debug, Clone)]
pub struct Frame {
    /// JPEG bytes, SOI through EOI inclusive
    pub data: Bytes,
    /// When the EOI marker was seen
    pub captured_at: Instant,
    /// Per-camera publication order, starting at 1
    pub sequence: u64,
}

impl Frame {
    /// Create a frame captured now
    pub fn new(data: Bytes, sequence: u64) -> Self {
        Self {
            data,
            captured_at: Instant::now(),
            sequence,
        }
    }

    /// Size of the image in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the image is empty (never true for parsed frames)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Time elapsed since capture, measured against `now`
    pub fn age_at(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.captured_at)
    }
}

/// Unique identifier for a registered viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
