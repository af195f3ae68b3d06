//! Client write error types
//!
//! A failed write only ever removes the viewer it happened on.

/// Failure delivering to one viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientWriteError {
    /// The viewer's sink is gone (serve task ended or unregistered)
    Closed,
    /// Socket write failed
    Io(String),
    /// Socket write did not complete within the write timeout
    TimedOut,
}

impl std::fmt::Display for ClientWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientWriteError::Closed => write!(f, "Client sink closed"),
            ClientWriteError::Io(msg) => write!(f, "Client write failed: {}", msg),
            ClientWriteError::TimedOut => write!(f, "Client write timed out"),
        }
    }
}

impl std::error::Error for ClientWriteError {}

impl From<std::io::Error> for ClientWriteError {
    fn from(e: std::io::Error) -> Self {
        ClientWriteError::Io(e.to_string())
    }
}
