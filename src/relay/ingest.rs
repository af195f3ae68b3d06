//! Upstream ingestion
//!
//! Holds one streaming GET open against the camera, cuts the body into
//! frames, publishes each to the store and broadcasts it before reading on.
//! Every attempt ends in a [`SourceError`]; the loop logs it, waits the
//! reconnect delay, and starts over with a fresh framer and watchdog.

use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::state::ConnectionState;
use super::watchdog::Watchdog;
use crate::camera::CameraSource;
use crate::error::{Error, Result, SourceError};
use crate::mjpeg::JpegFramer;
use crate::registry::{Broadcaster, FrameStore};
use crate::server::config::RelayConfig;
use crate::stats::RelayStats;

/// Reads one camera's MJPEG stream forever
pub struct StreamIngester {
    camera: Arc<CameraSource>,
    config: RelayConfig,
    http: reqwest::Client,
    store: Arc<FrameStore>,
    broadcaster: Arc<Broadcaster>,
    stats: Arc<RelayStats>,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl StreamIngester {
    /// Create an ingester
    ///
    /// Fails only if the HTTP client cannot be built.
    pub fn new(
        camera: Arc<CameraSource>,
        config: RelayConfig,
        store: Arc<FrameStore>,
        broadcaster: Arc<Broadcaster>,
        stats: Arc<RelayStats>,
        state: Arc<watch::Sender<ConnectionState>>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| Error::Source(SourceError::Connect(e.to_string())))?;

        Ok(Self {
            camera,
            config,
            http,
            store,
            broadcaster,
            stats,
            state,
        })
    }

    /// Run connection attempts until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        let name = &self.camera.name;
        let mut first_attempt = true;

        while !shutdown.is_cancelled() {
            if !first_attempt {
                self.stats.record_reconnect();
            }
            first_attempt = false;

            let attempt = shutdown.child_token();
            let watchdog = Watchdog::new(
                Arc::clone(&self.store),
                self.config.watchdog_interval,
                self.config.stall_timeout,
            );

            let read = async {
                let error = self.attempt(&attempt).await;
                attempt.cancel();
                error
            };
            let (error, stalled) = tokio::join!(read, watchdog.run(attempt.clone()));

            self.state.send_replace(ConnectionState::Disconnected);
            if shutdown.is_cancelled() {
                break;
            }

            if stalled {
                self.stats.record_stall();
                tracing::warn!(
                    camera = %name,
                    stall_timeout_ms = self.config.stall_timeout.as_millis() as u64,
                    "Frames stalled, cancelled read to reconnect"
                );
            } else {
                tracing::warn!(camera = %name, error = %error, "Source connection lost");
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }

        tracing::debug!(camera = %name, "Ingest loop stopped");
    }

    /// One connection attempt, start to finish
    async fn attempt(&self, cancel: &CancellationToken) -> SourceError {
        self.state.send_replace(ConnectionState::Connecting);
        tracing::info!(camera = %self.camera.name, url = %self.camera.url, "Connecting to source");
        for alias in &self.camera.aliases {
            tracing::info!(
                camera = %self.camera.name,
                "Viewers: http://{}:{}/{}",
                self.config.bind_ip,
                self.camera.port,
                alias
            );
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SourceError::Cancelled,
            response = self.http.get(&self.camera.url).send() => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => return SourceError::Connect(e.to_string()),
        };
        if !response.status().is_success() {
            return SourceError::Status(response.status().as_u16());
        }

        self.state.send_replace(ConnectionState::Streaming);
        tracing::info!(camera = %self.camera.name, "Source connected");

        self.consume(response.bytes_stream(), cancel).await
    }

    /// Frame and publish a body stream until it ends, fails, or `cancel` fires
    ///
    /// The cancellation check is the first branch at every read, so a stalled
    /// attempt unwinds at its next read checkpoint.
    pub async fn consume<S, E>(&self, stream: S, cancel: &CancellationToken) -> SourceError
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: Display,
    {
        let mut framer = JpegFramer::with_max_frame_size(self.config.max_frame_size);
        let mut stream = std::pin::pin!(stream);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SourceError::Cancelled,
                next = stream.next() => next,
            };

            let chunk = match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => return SourceError::Read(e.to_string()),
                None => return SourceError::EndOfStream,
            };
            self.stats.record_bytes(chunk.len());

            for data in framer.push(&chunk) {
                let frame = self.store.publish(data);
                self.stats.record_frame();
                tracing::trace!(
                    camera = %self.camera.name,
                    sequence = frame.sequence,
                    bytes = frame.len(),
                    "Frame"
                );
                self.broadcaster.broadcast(&frame).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::time::Duration;

    use futures_util::stream;

    use super::*;
    use crate::mjpeg::encode_part;
    use crate::registry::{ChannelSink, ClientRegistry};

    fn jpeg(fill: u8, len: usize) -> Vec<u8> {
        let mut v = vec![0xFF, 0xD8];
        v.extend(std::iter::repeat(fill).take(len));
        v.extend_from_slice(&[0xFF, 0xD9]);
        v
    }

    fn ingester(store: &Arc<FrameStore>, registry: &Arc<ClientRegistry>) -> StreamIngester {
        ingester_with(store, registry, "http://127.0.0.1:9/", RelayConfig::default())
    }

    fn ingester_with(
        store: &Arc<FrameStore>,
        registry: &Arc<ClientRegistry>,
        url: &str,
        config: RelayConfig,
    ) -> StreamIngester {
        let stats = Arc::new(RelayStats::new());
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(registry), Arc::clone(&stats)));
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        StreamIngester::new(
            Arc::new(CameraSource::new("test", url, 0, ["cam"])),
            config,
            Arc::clone(store),
            broadcaster,
            stats,
            Arc::new(state),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_consume_publishes_and_broadcasts() {
        let store = Arc::new(FrameStore::new());
        let registry = Arc::new(ClientRegistry::new(Arc::clone(&store)));
        let ingester = ingester(&store, &registry);

        let (sink, mut feed) = ChannelSink::new(16);
        registry.register(Arc::new(sink)).await.unwrap();

        let a = jpeg(0x11, 300);
        let b = jpeg(0x22, 10);
        let mut body = a.clone();
        body.extend_from_slice(&b);

        // Split awkwardly so markers straddle chunk boundaries
        let chunks: Vec<std::result::Result<Bytes, Infallible>> = vec![
            Ok(Bytes::copy_from_slice(&body[..1])),
            Ok(Bytes::copy_from_slice(&body[1..303])),
            Ok(Bytes::copy_from_slice(&body[303..])),
        ];

        let cancel = CancellationToken::new();
        let end = ingester.consume(stream::iter(chunks), &cancel).await;
        assert!(matches!(end, SourceError::EndOfStream));

        assert_eq!(store.sequence(), 2);
        assert_eq!(&store.get().unwrap().data[..], &b[..]);
        assert_eq!(feed.next().await.unwrap(), encode_part(&a));
        assert_eq!(feed.next().await.unwrap(), encode_part(&b));
        assert_eq!(ingester.stats.snapshot().frames_received, 2);
        assert_eq!(ingester.stats.snapshot().bytes_received, body.len() as u64);
    }

    #[tokio::test]
    async fn test_consume_read_error() {
        let store = Arc::new(FrameStore::new());
        let registry = Arc::new(ClientRegistry::new(Arc::clone(&store)));
        let ingester = ingester(&store, &registry);

        let chunks: Vec<std::result::Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(&[0xFF, 0xD8, 0x00])),
            Err("connection reset".to_string()),
        ];

        let cancel = CancellationToken::new();
        let end = ingester.consume(stream::iter(chunks), &cancel).await;

        assert!(matches!(end, SourceError::Read(msg) if msg == "connection reset"));
        assert!(store.get().is_none());
    }

    #[tokio::test]
    async fn test_consume_observes_cancel() {
        let store = Arc::new(FrameStore::new());
        let registry = Arc::new(ClientRegistry::new(Arc::clone(&store)));
        let ingester = ingester(&store, &registry);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let end = ingester
            .consume(stream::pending::<std::result::Result<Bytes, Infallible>>(), &cancel)
            .await;
        assert!(matches!(end, SourceError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_attempt_waits_reconnect_delay() {
        let store = Arc::new(FrameStore::new());
        let registry = Arc::new(ClientRegistry::new(Arc::clone(&store)));
        // Unparseable URL: every attempt fails on first poll without touching the network
        let config = RelayConfig::default().reconnect_delay(Duration::from_millis(2000));
        let ingester = ingester_with(&store, &registry, "not a url", config);

        let shutdown = CancellationToken::new();
        let observe = async {
            tokio::time::sleep(Duration::from_millis(1990)).await;
            let before = ingester.stats.snapshot().reconnects;
            let state_between = *ingester.state.borrow();

            tokio::time::sleep(Duration::from_millis(20)).await;
            let after = ingester.stats.snapshot().reconnects;

            tokio::time::sleep(Duration::from_millis(2000)).await;
            let later = ingester.stats.snapshot().reconnects;

            shutdown.cancel();
            (before, state_between, after, later)
        };
        let (_, (before, state_between, after, later)) =
            tokio::join!(ingester.run(shutdown.clone()), observe);

        assert_eq!(before, 0);
        assert_eq!(state_between, ConnectionState::Disconnected);
        assert_eq!(after, 1);
        assert_eq!(later, 2);
    }
}
