//! Viewer listener
//!
//! Handles the TCP accept loop for one camera's port and spawns a serve task
//! per viewer.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::camera::CameraSource;
use crate::error::Result;
use crate::registry::ClientRegistry;
use crate::server::config::RelayConfig;
use crate::server::request::UNAVAILABLE_RESPONSE;
use crate::server::viewer::ViewerConnection;

/// Accepts viewers for one camera
pub struct ViewerListener {
    listener: TcpListener,
    camera: Arc<CameraSource>,
    config: RelayConfig,
    registry: Arc<ClientRegistry>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
    tasks: TaskTracker,
}

impl ViewerListener {
    /// Bind the camera's port on the configured address
    pub async fn bind(
        camera: Arc<CameraSource>,
        config: RelayConfig,
        registry: Arc<ClientRegistry>,
    ) -> Result<Self> {
        let addr = SocketAddr::new(config.bind_ip, camera.port);
        let listener = TcpListener::bind(addr).await?;

        let connection_semaphore = if config.max_clients > 0 {
            Some(Arc::new(Semaphore::new(config.max_clients)))
        } else {
            None
        };

        Ok(Self {
            listener,
            camera,
            config,
            registry,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
            tasks: TaskTracker::new(),
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept viewers until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            camera = %self.camera.name,
            addr = ?self.listener.local_addr().ok(),
            "Viewer listener started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        self.handle_connection(socket, peer_addr, &shutdown);
                    }
                    Err(e) => {
                        tracing::error!(
                            camera = %self.camera.name,
                            error = %e,
                            "Failed to accept connection"
                        );
                    }
                },
            }
        }

        self.tasks.close();
    }

    /// Wait for every spawned serve task to finish
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }

    fn handle_connection(
        &self,
        socket: TcpStream,
        peer_addr: SocketAddr,
        shutdown: &CancellationToken,
    ) {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        // Check connection limit
        let permit = match self.connection_semaphore {
            Some(ref sem) => match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(
                        camera = %self.camera.name,
                        peer = %peer_addr,
                        "Connection rejected: limit reached"
                    );
                    self.tasks.spawn(async move {
                        let mut socket = socket;
                        let _ = socket.write_all(UNAVAILABLE_RESPONSE).await;
                        let _ = socket.shutdown().await;
                    });
                    return;
                }
            },
            None => None,
        };

        tracing::debug!(session_id = session_id, peer = %peer_addr, "New connection");

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let connection = ViewerConnection::new(
            session_id,
            socket,
            peer_addr,
            Arc::clone(&self.camera),
            self.config.clone(),
            Arc::clone(&self.registry),
        );
        let shutdown = shutdown.clone();

        self.tasks.spawn(async move {
            let _permit = permit;
            let outcome = connection.run(shutdown).await;
            tracing::debug!(session_id = session_id, outcome = ?outcome, "Connection closed");
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}
