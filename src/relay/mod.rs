//! Per-camera relay engine
//!
//! This module provides:
//! - The upstream ingest loop with backoff and reconnect
//! - The per-attempt stall watchdog
//! - Keep-alive resends of the last frame
//! - [`RelayGroup`], which wires one camera's pieces together

pub mod group;
pub mod ingest;
pub mod keepalive;
pub mod state;
pub mod watchdog;

pub use group::RelayGroup;
pub use ingest::StreamIngester;
pub use keepalive::KeepAliveTicker;
pub use state::ConnectionState;
pub use watchdog::{Watchdog, WatchdogVerdict};
