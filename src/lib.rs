//! # mjpeg-relay
//!
//! Relays MJPEG streams from network cameras to any number of HTTP viewers.
//!
//! Each configured camera gets an independent [`RelayGroup`]: one upstream
//! connection, re-framed on JPEG SOI/EOI markers, with the latest frame cached
//! and fanned out to every viewer as `multipart/x-mixed-replace`. Stalled
//! sources are detected and reconnected; idle viewers are kept alive by
//! re-sending the last frame.
//!
//! ```no_run
//! use mjpeg_relay::{CameraSource, RelayConfig, RelayGroup};
//!
//! # async fn example() -> mjpeg_relay::Result<()> {
//! let camera = CameraSource::new("door", "http://10.0.0.5:81/stream", 8081, ["cam1", "front"]);
//! let group = RelayGroup::bind(camera, RelayConfig::default()).await?;
//! group.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await;
//! # Ok(())
//! # }
//! ```

pub mod camera;
pub mod error;
pub mod mjpeg;
pub mod registry;
pub mod relay;
pub mod server;
pub mod stats;

pub use camera::{load_cameras, parse_cameras, CameraSource};
pub use error::{ConfigError, Error, Result, SourceError};
pub use registry::{Broadcaster, ClientRegistry, Frame, FrameStore};
pub use relay::{ConnectionState, RelayGroup};
pub use server::RelayConfig;
pub use stats::RelayStatsSnapshot;
