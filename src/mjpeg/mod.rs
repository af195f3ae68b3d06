//! MJPEG handling
//!
//! This module provides:
//! - SOI/EOI framing of the raw upstream byte stream
//! - Multipart part and HTTP chunk encoding for viewers

pub mod framer;
pub mod part;

pub use framer::{JpegFramer, EOI, SOI};
pub use part::{encode_chunk, encode_part, BOUNDARY, STREAM_CONTENT_TYPE};
