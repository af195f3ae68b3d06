//! Statistics for relay groups

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one camera
///
/// Updated with relaxed atomics on the hot path; read through
/// [`RelayStats::snapshot`].
#[derive(Debug, Default)]
pub struct RelayStats {
    frames_received: AtomicU64,
    bytes_received: AtomicU64,
    frames_broadcast: AtomicU64,
    keepalive_resends: AtomicU64,
    reconnects: AtomicU64,
    stalls: AtomicU64,
    clients_registered: AtomicU64,
    clients_dropped: AtomicU64,
}

impl RelayStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Upstream delivered `bytes` more bytes
    pub fn record_bytes(&self, bytes: usize) {
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// A complete frame was parsed
    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// A broadcast pass ran
    pub fn record_broadcast(&self) {
        self.frames_broadcast.fetch_add(1, Ordering::Relaxed);
    }

    /// The last frame was re-sent to keep idle viewers open
    pub fn record_keepalive(&self) {
        self.keepalive_resends.fetch_add(1, Ordering::Relaxed);
    }

    /// A new upstream connection attempt started after a failure
    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// The watchdog cancelled a stalled attempt
    pub fn record_stall(&self) {
        self.stalls.fetch_add(1, Ordering::Relaxed);
    }

    /// A viewer joined
    pub fn record_client_registered(&self) {
        self.clients_registered.fetch_add(1, Ordering::Relaxed);
    }

    /// A viewer left or was removed
    pub fn record_client_dropped(&self) {
        self.clients_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters
    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_broadcast: self.frames_broadcast.load(Ordering::Relaxed),
            keepalive_resends: self.keepalive_resends.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            stalls: self.stalls.load(Ordering::Relaxed),
            clients_registered: self.clients_registered.load(Ordering::Relaxed),
            clients_dropped: self.clients_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RelayStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStatsSnapshot {
    /// Complete frames parsed from the source
    pub frames_received: u64,
    /// Raw bytes read from the source
    pub bytes_received: u64,
    /// Broadcast passes (fresh frames and keep-alive resends)
    pub frames_broadcast: u64,
    /// Keep-alive resends
    pub keepalive_resends: u64,
    /// Connection attempts after the first
    pub reconnects: u64,
    /// Attempts cancelled by the watchdog
    pub stalls: u64,
    /// Viewers ever registered
    pub clients_registered: u64,
    /// Viewers removed
    pub clients_dropped: u64,
}

impl RelayStatsSnapshot {
    /// Viewers currently attached
    pub fn active_clients(&self) -> u64 {
        self.clients_registered.saturating_sub(self.clients_dropped)
    }
}
