//! Per-viewer serve task
//!
//! Reads the request head, answers it, and for a matching path streams
//! multipart parts from the viewer's queue to the socket until the registry
//! removes it, a write fails, or the peer goes away. The viewer is always
//! unregistered on the way out.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use super::config::RelayConfig;
use super::request::{
    read_request_head, stream_response_head, RequestError, BAD_REQUEST_RESPONSE,
    NOT_FOUND_RESPONSE,
};
use crate::camera::CameraSource;
use crate::mjpeg::encode_chunk;
use crate::mjpeg::part::LAST_CHUNK;
use crate::registry::{ChannelSink, ClientFeed, ClientRegistry, ClientWriteError};

/// How a viewer connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerOutcome {
    /// Answered with an error status and closed; never registered
    Rejected(u16),
    /// Peer sent nothing usable before closing or timing out
    NoRequest,
    /// Registry removed the viewer (broadcast failure or shutdown)
    Unregistered,
    /// Peer closed its side
    PeerClosed,
    /// Socket write failed or timed out
    WriteFailed(ClientWriteError),
    /// Relay shut down while the viewer was connected
    Shutdown,
}

/// One accepted viewer socket
pub struct ViewerConnection {
    session_id: u64,
    socket: TcpStream,
    peer_addr: SocketAddr,
    camera: Arc<CameraSource>,
    config: RelayConfig,
    registry: Arc<ClientRegistry>,
}

impl ViewerConnection {
    /// Wrap an accepted socket
    pub fn new(
        session_id: u64,
        socket: TcpStream,
        peer_addr: SocketAddr,
        camera: Arc<CameraSource>,
        config: RelayConfig,
        registry: Arc<ClientRegistry>,
    ) -> Self {
        Self {
            session_id,
            socket,
            peer_addr,
            camera,
            config,
            registry,
        }
    }

    /// Serve the connection to completion
    pub async fn run(self, shutdown: CancellationToken) -> ViewerOutcome {
        let (mut reader, mut writer) = self.socket.into_split();
        let write_timeout = self.config.write_timeout;

        let head = tokio::select! {
            _ = shutdown.cancelled() => return ViewerOutcome::Shutdown,
            head = tokio::time::timeout(
                self.config.request_timeout,
                read_request_head(&mut reader),
            ) => head,
        };

        let head = match head {
            Ok(Ok(head)) => head,
            Ok(Err(RequestError::Closed)) => return ViewerOutcome::NoRequest,
            Ok(Err(e)) => {
                tracing::debug!(session_id = self.session_id, error = %e, "Bad request");
                reject(&mut writer, BAD_REQUEST_RESPONSE, write_timeout).await;
                return ViewerOutcome::Rejected(400);
            }
            Err(_) => {
                tracing::debug!(session_id = self.session_id, "Request head timed out");
                return ViewerOutcome::NoRequest;
            }
        };

        if !self.camera.matches_path(&head.path) {
            tracing::debug!(
                camera = %self.camera.name,
                session_id = self.session_id,
                path = %head.path,
                "Unknown path"
            );
            reject(&mut writer, NOT_FOUND_RESPONSE, write_timeout).await;
            return ViewerOutcome::Rejected(404);
        }

        let response_head = stream_response_head();
        if let Err(e) = write_all(&mut writer, response_head.as_bytes(), write_timeout).await {
            return ViewerOutcome::WriteFailed(e);
        }

        let (sink, feed) = ChannelSink::new(self.config.client_queue_capacity);
        let client_id = match self.registry.register(Arc::new(sink)).await {
            Ok(id) => id,
            Err(e) => return ViewerOutcome::WriteFailed(e),
        };

        tracing::info!(
            camera = %self.camera.name,
            client_id = %client_id,
            peer = %self.peer_addr,
            path = %head.path,
            "Viewer connected"
        );

        let outcome = pump(feed, reader, writer, write_timeout, &shutdown).await;
        self.registry.unregister(client_id).await;

        tracing::info!(
            camera = %self.camera.name,
            client_id = %client_id,
            outcome = ?outcome,
            "Viewer disconnected"
        );
        outcome
    }
}

/// Copy queued parts to the socket as HTTP chunks
async fn pump(
    mut feed: ClientFeed,
    mut reader: OwnedReadHalf,
    mut writer: OwnedWriteHalf,
    write_timeout: Duration,
    shutdown: &CancellationToken,
) -> ViewerOutcome {
    let mut scratch = [0u8; 256];

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                finish(&mut writer, write_timeout).await;
                return ViewerOutcome::Shutdown;
            }
            part = feed.next() => match part {
                Some(part) => {
                    let chunk = encode_chunk(&part);
                    if let Err(e) = write_all(&mut writer, &chunk, write_timeout).await {
                        return ViewerOutcome::WriteFailed(e);
                    }
                }
                None => {
                    finish(&mut writer, write_timeout).await;
                    return ViewerOutcome::Unregistered;
                }
            },
            read = reader.read(&mut scratch) => match read {
                Ok(0) | Err(_) => return ViewerOutcome::PeerClosed,
                // Anything the viewer sends after its request is ignored
                Ok(_) => {}
            },
        }
    }
}

/// Terminate the chunked body and close the write side
async fn finish(writer: &mut OwnedWriteHalf, timeout: Duration) {
    if write_all(writer, LAST_CHUNK, timeout).await.is_ok() {
        let _ = writer.shutdown().await;
    }
}

async fn write_all<W>(
    writer: &mut W,
    data: &[u8],
    timeout: Duration,
) -> Result<(), ClientWriteError>
where
    W: AsyncWrite + Unpin,
{
    match tokio::time::timeout(timeout, writer.write_all(data)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(ClientWriteError::TimedOut),
    }
}

async fn reject<W>(writer: &mut W, response: &[u8], timeout: Duration)
where
    W: AsyncWrite + Unpin,
{
    if write_all(writer, response, timeout).await.is_ok() {
        let _ = writer.shutdown().await;
    }
}
