//! Per-camera frame store and viewer fan-out
//!
//! # Architecture
//!
//! ```text
//!   [StreamIngester] ──set()──► FrameStore ◄──get()── [KeepAliveTicker]
//!          │                        │
//!          │                        └──get() on register (late joiner)
//!          ▼                                  │
//!     Broadcaster ──snapshot──► ClientRegistry ◄──register()── [ViewerListener]
//!          │                    { id → Arc<dyn FrameSink> }
//!          ▼                        │
//!    deliver(part) ──► mpsc ──► serve task ──► TCP
//! ```
//!
//! # Zero-Copy Design
//!
//! A frame is encoded into its multipart part once per broadcast; every
//! viewer's queue receives a reference-counted clone of the same `Bytes`.

pub mod broadcast;
pub mod clients;
pub mod error;
pub mod frame;
pub mod sink;
pub mod store;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use clients::ClientRegistry;
pub use error::ClientWriteError;
pub use frame::{ClientId, Frame};
pub use sink::{ChannelSink, ClientFeed, Delivery, FrameSink};
pub use store::FrameStore;
