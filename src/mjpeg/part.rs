//! Downstream wire format
//!
//! Each frame goes to viewers as one `multipart/x-mixed-replace` part, and
//! each part travels as one HTTP/1.1 chunk:
//!
//! ```text
//! <hex len>\r\n
//! \r\n--frame\r\nContent-Type: image/jpeg\r\nContent-Length: <N>\r\n\r\n<N jpeg bytes>
//! \r\n
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// Multipart boundary token
pub const BOUNDARY: &str = "frame";

/// Response content type announcing the boundary
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Terminating zero-length chunk
pub const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

/// Header block preceding a part of `len` JPEG bytes
pub fn part_header(len: usize) -> String {
    format!(
        "\r\n--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        BOUNDARY, len
    )
}

/// Wrap one JPEG image as a multipart part
pub fn encode_part(jpeg: &[u8]) -> Bytes {
    let header = part_header(jpeg.len());
    let mut buf = BytesMut::with_capacity(header.len() + jpeg.len());
    buf.put_slice(header.as_bytes());
    buf.put_slice(jpeg);
    buf.freeze()
}

/// Frame `data` as a single chunk of a chunked transfer-encoded body
pub fn encode_chunk(data: &[u8]) -> Bytes {
    let size_line = format!("{:x}\r\n", data.len());
    let mut buf = BytesMut::with_capacity(size_line.len() + data.len() + 2);
    buf.put_slice(size_line.as_bytes());
    buf.put_slice(data);
    buf.put_slice(b"\r\n");
    buf.freeze()
}
