//! Relay group
//!
//! Everything one camera needs, owned in one place: frame store, viewer
//! registry, broadcaster, ingester, keep-alive ticker and viewer listener.
//! Groups share nothing, so a failing camera never affects another.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::ingest::StreamIngester;
use super::keepalive::KeepAliveTicker;
use super::state::ConnectionState;
use crate::camera::CameraSource;
use crate::error::{ConfigError, Result};
use crate::registry::{Broadcaster, ClientRegistry, FrameStore};
use crate::server::config::RelayConfig;
use crate::server::listener::ViewerListener;
use crate::stats::{RelayStats, RelayStatsSnapshot};

/// One camera's relay
pub struct RelayGroup {
    camera: Arc<CameraSource>,
    store: Arc<FrameStore>,
    registry: Arc<ClientRegistry>,
    stats: Arc<RelayStats>,
    state: Arc<watch::Sender<ConnectionState>>,
    listener: ViewerListener,
    ingester: StreamIngester,
    keepalive: KeepAliveTicker,
}

impl RelayGroup {
    /// Build the group and bind its viewer port
    ///
    /// Nothing runs until [`RelayGroup::run`] is called.
    pub async fn bind(camera: CameraSource, config: RelayConfig) -> Result<Self> {
        let camera = Arc::new(camera);
        let store = Arc::new(FrameStore::new());
        let stats = Arc::new(RelayStats::new());
        let registry = Arc::new(ClientRegistry::with_stats(
            Arc::clone(&store),
            Arc::clone(&stats),
        ));
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry), Arc::clone(&stats)));
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let state = Arc::new(state);

        let listener =
            ViewerListener::bind(Arc::clone(&camera), config.clone(), Arc::clone(&registry))
                .await?;

        let ingester = StreamIngester::new(
            Arc::clone(&camera),
            config.clone(),
            Arc::clone(&store),
            Arc::clone(&broadcaster),
            Arc::clone(&stats),
            Arc::clone(&state),
        )?;

        let keepalive = KeepAliveTicker::new(
            Arc::clone(&store),
            broadcaster,
            Arc::clone(&stats),
            config.keepalive_interval,
            config.keepalive_threshold,
        );

        Ok(Self {
            camera,
            store,
            registry,
            stats,
            state,
            listener,
            ingester,
            keepalive,
        })
    }

    /// Bind a group for every camera
    ///
    /// A camera whose viewer port cannot be bound is logged and skipped. Fails
    /// when no group could be bound at all.
    pub async fn bind_all(
        cameras: Vec<CameraSource>,
        config: &RelayConfig,
    ) -> Result<Vec<RelayGroup>> {
        let mut groups = Vec::with_capacity(cameras.len());
        let mut last_error = None;

        for camera in cameras {
            let name = camera.name.clone();
            match Self::bind(camera, config.clone()).await {
                Ok(group) => groups.push(group),
                Err(e) => {
                    tracing::error!(camera = %name, error = %e, "Cannot start relay");
                    last_error = Some(e);
                }
            }
        }

        if !groups.is_empty() {
            return Ok(groups);
        }
        Err(last_error.unwrap_or_else(|| ConfigError::Empty.into()))
    }

    /// The camera this group relays
    pub fn camera(&self) -> &CameraSource {
        &self.camera
    }

    /// Address viewers connect to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The latest-frame store
    pub fn store(&self) -> &Arc<FrameStore> {
        &self.store
    }

    /// The viewer registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Counter snapshot
    pub fn stats(&self) -> RelayStatsSnapshot {
        self.stats.snapshot()
    }

    /// Current upstream connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch upstream connection state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Run accept, ingest and keep-alive loops until `shutdown` is cancelled
    ///
    /// On shutdown every viewer is unregistered and their serve tasks are
    /// awaited.
    pub async fn run(&self, shutdown: CancellationToken) {
        tokio::join!(
            self.listener.run(shutdown.clone()),
            self.ingester.run(shutdown.clone()),
            self.keepalive.run(shutdown.clone()),
        );

        self.registry.clear().await;
        self.listener.drain().await;

        tracing::info!(camera = %self.camera.name, "Relay stopped");
    }

    /// Run until `shutdown` completes
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let token = CancellationToken::new();
        let run = self.run(token.clone());
        let stop = async {
            shutdown.await;
            token.cancel();
        };
        tokio::join!(run, stop);
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;
    use crate::error::Error;

    fn loopback() -> RelayConfig {
        RelayConfig::default().bind("127.0.0.1".parse().unwrap())
    }

    #[tokio::test]
    async fn test_bind_all_skips_busy_port() {
        let busy = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = busy.local_addr().unwrap().port();

        let cameras = vec![
            CameraSource::new("taken", "http://127.0.0.1:9/", port, ["a"]),
            CameraSource::new("free", "http://127.0.0.1:9/", 0, ["b"]),
        ];
        let groups = RelayGroup::bind_all(cameras, &loopback()).await.unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].camera().name, "free");
    }

    #[tokio::test]
    async fn test_bind_all_fails_when_nothing_binds() {
        let busy = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = busy.local_addr().unwrap().port();

        let cameras = vec![CameraSource::new("taken", "http://127.0.0.1:9/", port, ["a"])];
        let result = RelayGroup::bind_all(cameras, &loopback()).await;
        assert!(matches!(result, Err(Error::Io(_))));

        let result = RelayGroup::bind_all(Vec::new(), &loopback()).await;
        assert!(matches!(result, Err(Error::Config(ConfigError::Empty))));
    }

    #[tokio::test]
    async fn test_new_group_starts_disconnected() {
        let camera = CameraSource::new("door", "http://127.0.0.1:9/", 0, ["cam1"]);
        let group = RelayGroup::bind(camera, loopback()).await.unwrap();

        assert_eq!(group.state(), ConnectionState::Disconnected);
        assert!(group.store().get().is_none());
        assert!(group.registry().is_empty().await);
    }
}
