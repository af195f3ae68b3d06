//! Error types for the relay
//!
//! Failures are contained per camera: source errors trigger a reconnect,
//! client errors remove a single viewer, and only configuration errors are
//! ever fatal (at startup).

use std::fmt;
use std::io;

pub use crate::registry::ClientWriteError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket or filesystem I/O failure
    Io(io::Error),
    /// Camera configuration could not be loaded or is invalid
    Config(ConfigError),
    /// Upstream camera connection failure
    Source(SourceError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Source(e) => write!(f, "Source error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Source(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<SourceError> for Error {
    fn from(e: SourceError) -> Self {
        Error::Source(e)
    }
}

/// Failure to establish or maintain the upstream camera connection
///
/// Never surfaced beyond logging; the ingester backs off and retries.
#[derive(Debug)]
pub enum SourceError {
    /// Request could not be sent (refused, DNS, TLS, connect timeout)
    Connect(String),
    /// Source answered with a non-success status
    Status(u16),
    /// Body read failed mid-stream
    Read(String),
    /// Source closed the stream
    EndOfStream,
    /// Attempt was cancelled by the watchdog or by shutdown
    Cancelled,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Connect(msg) => write!(f, "connect failed: {}", msg),
            SourceError::Status(code) => write!(f, "unexpected HTTP status {}", code),
            SourceError::Read(msg) => write!(f, "read failed: {}", msg),
            SourceError::EndOfStream => write!(f, "end of stream"),
            SourceError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Camera configuration errors
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read
    Read {
        path: String,
        source: io::Error,
    },
    /// Config file is not valid JSON for a camera list
    Parse(serde_json::Error),
    /// No cameras defined
    Empty,
    /// A camera definition failed validation
    Invalid { camera: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => write!(f, "cannot read {}: {}", path, source),
            ConfigError::Parse(e) => write!(f, "invalid camera list: {}", e),
            ConfigError::Empty => write!(f, "no cameras configured"),
            ConfigError::Invalid { camera, reason } => {
                write!(f, "camera '{}': {}", camera, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}
