//! Viewer-facing HTTP server
//!
//! Handles:
//! - Accepting viewer connections on a camera's port
//! - Matching request paths against the camera's aliases
//! - Streaming multipart parts to accepted viewers

pub mod config;
pub mod listener;
pub mod request;
pub mod viewer;

pub use config::RelayConfig;
pub use listener::ViewerListener;
pub use viewer::{ViewerConnection, ViewerOutcome};
