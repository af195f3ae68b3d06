//! Minimal HTTP/1.1 request handling for viewers
//!
//! Viewers only ever need a request line; headers are read and discarded so
//! the socket is left positioned after the head.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::mjpeg::STREAM_CONTENT_TYPE;

/// Largest request head accepted
pub const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// Parsed request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    /// Request method, as sent
    pub method: String,
    /// Path component of the request target (query included)
    pub path: String,
    /// Protocol version, e.g. `HTTP/1.1`
    pub version: String,
}

/// Reasons a request head could not be read
#[derive(Debug)]
pub enum RequestError {
    /// Peer closed before sending a full head
    Closed,
    /// Head exceeded [`MAX_REQUEST_HEAD`]
    TooLarge,
    /// Request line could not be parsed
    Malformed,
    /// Socket read failed
    Io(std::io::Error),
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Closed => write!(f, "Connection closed before request head"),
            RequestError::TooLarge => write!(f, "Request head too large"),
            RequestError::Malformed => write!(f, "Malformed request line"),
            RequestError::Io(e) => write!(f, "Read failed: {}", e),
        }
    }
}

impl std::error::Error for RequestError {}

/// Response head for an accepted viewer
pub fn stream_response_head() -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: {}\r\n\
         Transfer-Encoding: chunked\r\n\
         Cache-Control: no-cache\r\n\
         Connection: close\r\n\
         \r\n",
        STREAM_CONTENT_TYPE
    )
}

/// Response for a path outside the alias set
pub const NOT_FOUND_RESPONSE: &[u8] =
    b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Response for an unreadable request
pub const BAD_REQUEST_RESPONSE: &[u8] =
    b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Response when the viewer cap is reached
pub const UNAVAILABLE_RESPONSE: &[u8] =
    b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Read and parse a request head
pub async fn read_request_head<R>(reader: &mut R) -> Result<RequestHead, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(1024);

    loop {
        if let Some(end) = find_head_end(&buf) {
            return parse_request_line(&buf[..end]);
        }
        if buf.len() >= MAX_REQUEST_HEAD {
            return Err(RequestError::TooLarge);
        }

        let n = reader.read_buf(&mut buf).await.map_err(RequestError::Io)?;
        if n == 0 {
            return Err(RequestError::Closed);
        }
    }
}

/// Offset of the blank line ending the head, if present
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .or_else(|| buf.windows(2).position(|w| w == b"\n\n"))
}

fn parse_request_line(head: &[u8]) -> Result<RequestHead, RequestError> {
    let head = std::str::from_utf8(head).map_err(|_| RequestError::Malformed)?;
    let line = head.lines().next().ok_or(RequestError::Malformed)?;

    let mut parts = line.split_whitespace();
    let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v)) if v.starts_with("HTTP/") => (m, t, v),
        _ => return Err(RequestError::Malformed),
    };
    if parts.next().is_some() {
        return Err(RequestError::Malformed);
    }

    Ok(RequestHead {
        method: method.to_string(),
        path: origin_path(target).to_string(),
        version: version.to_string(),
    })
}

/// Reduce an absolute-form target (`http://host/p`) to its path
fn origin_path(target: &str) -> &str {
    let rest = match target
        .strip_prefix("http://")
        .or_else(|| target.strip_prefix("https://"))
    {
        Some(rest) => rest,
        None => return target,
    };
    match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "/",
    }
}
