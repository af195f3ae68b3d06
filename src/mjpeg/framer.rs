//! JPEG framing over a boundary-less byte stream
//!
//! Frames are cut purely on JPEG magic bytes; any multipart boundaries or
//! headers the camera interleaves are skipped because they fall outside an
//! SOI..EOI span.
//!
//! ```text
//!   ... junk ... FF D8 [ image bytes ... ] FF D9 ... junk ... FF D8 ...
//!                └── start accumulating    └── emit frame, stop
//! ```
//!
//! An SOI seen mid-frame discards the partial frame and restarts from the
//! new marker. Truncated frames are dropped without being counted.

use bytes::{BufMut, Bytes, BytesMut};

/// JPEG Start-Of-Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// JPEG End-Of-Image marker
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Default cap on a single accumulating frame (8MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;

/// Incremental SOI/EOI frame extractor
#[derive(Debug)]
pub struct JpegFramer {
    /// Bytes of the frame being accumulated, starting with SOI
    buf: BytesMut,
    /// Whether an SOI has been seen and no EOI yet
    in_frame: bool,
    /// Last byte seen, so markers split across reads are still found
    prev: Option<u8>,
    /// Partial frames longer than this are abandoned
    max_frame_size: usize,
}

impl JpegFramer {
    /// Create a framer with the default frame size cap
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Create a framer with a custom frame size cap
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(64 * 1024),
            in_frame: false,
            prev: None,
            max_frame_size,
        }
    }

    /// Feed a chunk of the upstream stream, returning completed frames in
    /// arrival order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        let mut frames = Vec::new();
        for &b in chunk {
            if let Some(frame) = self.push_byte(b) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Feed a single byte
    pub fn push_byte(&mut self, b: u8) -> Option<Bytes> {
        let prev = self.prev.replace(b);

        if prev == Some(SOI[0]) && b == SOI[1] {
            // Restart from this marker even if a frame was in progress
            self.buf.clear();
            self.buf.put_slice(&SOI);
            self.in_frame = true;
            return None;
        }

        if !self.in_frame {
            return None;
        }

        self.buf.put_u8(b);

        let len = self.buf.len();
        if len > 2 && self.buf[len - 2..] == EOI {
            self.in_frame = false;
            return Some(self.buf.split().freeze());
        }

        if len > self.max_frame_size {
            self.buf.clear();
            self.in_frame = false;
        }

        None
    }

    /// Discard any partial frame and marker state
    pub fn reset(&mut self) {
        self.buf.clear();
        self.in_frame = false;
        self.prev = None;
    }

    /// Whether a frame is currently being accumulated
    pub fn is_accumulating(&self) -> bool {
        self.in_frame
    }

    /// Number of bytes in the partial frame
    pub fn pending_len(&self) -> usize {
        if self.in_frame {
            self.buf.len()
        } else {
            0
        }
    }
}

impl Default for JpegFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(body: &[u8]) -> Vec<u8> {
        let mut v = SOI.to_vec();
        v.extend_from_slice(body);
        v.extend_from_slice(&EOI);
        v
    }

    #[test]
    fn test_back_to_back_images() {
        let a = jpeg(&[0x01, 0x02, 0x03]);
        let b = jpeg(&[0x10; 100]);
        let c = jpeg(&[]);

        let mut stream = Vec::new();
        stream.extend_from_slice(&a);
        stream.extend_from_slice(&b);
        stream.extend_from_slice(&c);

        let mut framer = JpegFramer::new();
        let frames = framer.push(&stream);

        assert_eq!(frames.len(), 3);
        assert_eq!(&frames[0][..], &a[..]);
        assert_eq!(&frames[1][..], &b[..]);
        assert_eq!(&frames[2][..], &c[..]);
        assert!(!framer.is_accumulating());
    }

    #[test]
    fn test_multipart_wrapping_is_ignored() {
        let image = jpeg(&[0xAA; 32]);
        let mut stream = b"--myboundary\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        stream.extend_from_slice(&image);
        stream.extend_from_slice(b"\r\n--myboundary\r\n");

        let mut framer = JpegFramer::new();
        let frames = framer.push(&stream);

        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &image[..]);
    }

    #[test]
    fn test_soi_mid_frame_discards_partial() {
        let mut stream = SOI.to_vec();
        stream.extend_from_slice(&[0x55; 20]); // truncated, no EOI
        let complete = jpeg(&[0x66; 10]);
        stream.extend_from_slice(&complete);

        let mut framer = JpegFramer::new();
        let frames = framer.push(&stream);

        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &complete[..]);
    }

    #[test]
    fn test_eoi_without_soi_never_emits() {
        let mut framer = JpegFramer::new();
        assert!(framer.push(&[0x00, 0xFF, 0xD9, 0x12, 0xFF, 0xD9]).is_empty());
        assert!(!framer.is_accumulating());
    }

    #[test]
    fn test_bare_soi_then_eoi() {
        let mut framer = JpegFramer::new();
        let frames = framer.push(&[0xFF, 0xD8, 0xFF, 0xD9]);

        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &[0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[test]
    fn test_soi_byte_alone_is_not_eoi() {
        // FF D8 D9 ends in D8 D9, not FF D9
        let mut framer = JpegFramer::new();
        assert!(framer.push(&[0xFF, 0xD8, 0xD9]).is_empty());
        assert!(framer.is_accumulating());
        assert_eq!(framer.pending_len(), 3);
    }

    #[test]
    fn test_markers_split_across_chunks() {
        let image = jpeg(&[0x01, 0x02]);
        let mut framer = JpegFramer::new();

        let mut frames = Vec::new();
        for b in &image {
            frames.extend(framer.push(std::slice::from_ref(b)));
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &image[..]);
    }

    #[test]
    fn test_oversized_frame_dropped() {
        let mut framer = JpegFramer::with_max_frame_size(16);

        let mut stream = SOI.to_vec();
        stream.extend_from_slice(&[0x11; 64]);
        stream.extend_from_slice(&EOI);
        let small = jpeg(&[0x22; 4]);
        stream.extend_from_slice(&small);

        let frames = framer.push(&stream);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &small[..]);
    }

    #[test]
    fn test_reset_discards_partial() {
        let mut framer = JpegFramer::new();
        framer.push(&[0xFF, 0xD8, 0x01, 0x02, 0xFF]);
        assert!(framer.is_accumulating());

        framer.reset();
        assert!(!framer.is_accumulating());

        // The leftover FF must not pair with a D9 from the next attempt
        assert!(framer.push(&[0xD9]).is_empty());
    }
}
