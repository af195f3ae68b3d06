//! Upstream connection state machine
//!
//! ```text
//! Disconnected ──► Connecting ──► Streaming
//!      ▲               │              │
//!      └── backoff ◄───┴── stall | I/O error | EOF
//! ```
//!
//! There is no terminal state short of shutdown.

/// Where a relay group's upstream connection currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection; waiting out the backoff or not started
    Disconnected,
    /// Request sent, waiting for the response head
    Connecting,
    /// Response accepted, reading the body
    Streaming,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Streaming => "streaming",
        };
        f.write_str(name)
    }
}
