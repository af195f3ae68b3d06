//! Viewer write sinks
//!
//! A sink is the registry's handle on one viewer. Delivery never blocks the
//! caller: the production [`ChannelSink`] pushes encoded parts onto a bounded
//! queue drained by the viewer's serve task, which owns the socket.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use super::error::ClientWriteError;

/// Outcome of a successful delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Part accepted for writing
    Queued,
    /// Viewer is lagging; this part was dropped for it alone
    Skipped,
}

/// Destination for encoded multipart parts
pub trait FrameSink: Send + Sync {
    /// Hand one encoded part to the viewer
    fn deliver(&self, part: Bytes) -> Result<Delivery, ClientWriteError>;

    /// Signal the viewer's serve task that it has been removed
    fn close(&self);
}

/// Queue-backed sink feeding a viewer's serve task
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
    closed: CancellationToken,
}

impl ChannelSink {
    /// Create a sink and the feed its serve task reads from
    pub fn new(capacity: usize) -> (Self, ClientFeed) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let closed = CancellationToken::new();

        let sink = Self {
            tx,
            closed: closed.clone(),
        };
        (sink, ClientFeed { rx, closed })
    }
}

impl FrameSink for ChannelSink {
    fn deliver(&self, part: Bytes) -> Result<Delivery, ClientWriteError> {
        if self.closed.is_cancelled() {
            return Err(ClientWriteError::Closed);
        }

        match self.tx.try_send(part) {
            Ok(()) => Ok(Delivery::Queued),
            Err(TrySendError::Full(_)) => Ok(Delivery::Skipped),
            Err(TrySendError::Closed(_)) => Err(ClientWriteError::Closed),
        }
    }

    fn close(&self) {
        self.closed.cancel();
    }
}

/// Receiving end of a [`ChannelSink`]
pub struct ClientFeed {
    rx: mpsc::Receiver<Bytes>,
    closed: CancellationToken,
}

impl ClientFeed {
    /// Next part to write, or `None` once the sink has been closed
    ///
    /// Parts already queued when the sink is closed are discarded.
    pub async fn next(&mut self) -> Option<Bytes> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => None,
            part = self.rx.recv() => part,
        }
    }

    /// Token cancelled when the registry removes this viewer
    pub fn closed(&self) -> &CancellationToken {
        &self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_and_receive() {
        let (sink, mut feed) = ChannelSink::new(4);

        assert_eq!(
            sink.deliver(Bytes::from_static(b"one")),
            Ok(Delivery::Queued)
        );
        assert_eq!(feed.next().await, Some(Bytes::from_static(b"one")));
    }

    #[tokio::test]
    async fn test_full_queue_skips() {
        let (sink, _feed) = ChannelSink::new(1);

        assert_eq!(sink.deliver(Bytes::from_static(b"a")), Ok(Delivery::Queued));
        assert_eq!(sink.deliver(Bytes::from_static(b"b")), Ok(Delivery::Skipped));
    }

    #[tokio::test]
    async fn test_dropped_feed_is_closed() {
        let (sink, feed) = ChannelSink::new(4);
        drop(feed);

        assert_eq!(
            sink.deliver(Bytes::from_static(b"a")),
            Err(ClientWriteError::Closed)
        );
    }

    #[tokio::test]
    async fn test_close_ends_feed() {
        let (sink, mut feed) = ChannelSink::new(4);
        sink.deliver(Bytes::from_static(b"pending")).unwrap();
        sink.close();

        assert!(feed.next().await.is_none());
        assert!(feed.closed().is_cancelled());
        assert_eq!(
            sink.deliver(Bytes::from_static(b"late")),
            Err(ClientWriteError::Closed)
        );
    }
}
