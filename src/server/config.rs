//! Relay configuration

use std::net::IpAddr;
use std::time::Duration;

use crate::mjpeg::framer::DEFAULT_MAX_FRAME_SIZE;

/// Timing and socket options shared by every relay group
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address viewer listeners bind to (port comes from each camera)
    pub bind_ip: IpAddr,

    /// Wait between a failed upstream attempt and the next one
    pub reconnect_delay: Duration,

    /// Watchdog tick interval
    pub watchdog_interval: Duration,

    /// Frame age after which an attempt is considered stalled
    pub stall_timeout: Duration,

    /// Keep-alive tick interval
    pub keepalive_interval: Duration,

    /// Frame age after which the last frame is re-sent
    pub keepalive_threshold: Duration,

    /// Upstream connect timeout (the body stream itself has none)
    pub connect_timeout: Duration,

    /// Viewer must send its request head within this time
    pub request_timeout: Duration,

    /// A single socket write to a viewer must finish within this time
    pub write_timeout: Duration,

    /// Parts queued per viewer before frames are skipped for it
    pub client_queue_capacity: usize,

    /// Partial frames larger than this are dropped
    pub max_frame_size: usize,

    /// Maximum concurrent viewers per camera (0 = unlimited)
    pub max_clients: usize,

    /// Enable TCP_NODELAY on viewer sockets
    pub tcp_nodelay: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::from([0, 0, 0, 0]),
            reconnect_delay: Duration::from_millis(2000),
            watchdog_interval: Duration::from_millis(250),
            stall_timeout: Duration::from_millis(5000),
            keepalive_interval: Duration::from_millis(250),
            keepalive_threshold: Duration::from_millis(750),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            client_queue_capacity: 8,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_clients: 0, // Unlimited
            tcp_nodelay: true,
        }
    }
}

impl RelayConfig {
    /// Set the bind address
    pub fn bind(mut self, ip: IpAddr) -> Self {
        self.bind_ip = ip;
        self
    }

    /// Set the reconnect backoff
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the watchdog tick interval
    pub fn watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    /// Set the stall threshold
    pub fn stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// Set the keep-alive tick interval
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Set the keep-alive threshold
    pub fn keepalive_threshold(mut self, threshold: Duration) -> Self {
        self.keepalive_threshold = threshold;
        self
    }

    /// Set the upstream connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the viewer request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the viewer write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the per-viewer queue depth
    pub fn client_queue_capacity(mut self, capacity: usize) -> Self {
        self.client_queue_capacity = capacity.max(1);
        self
    }

    /// Set the frame size cap
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Set maximum viewers per camera
    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }
}
