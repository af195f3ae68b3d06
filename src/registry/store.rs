//! Latest-frame store
//!
//! Holds the single current frame for one camera. There is exactly one
//! writer (that camera's ingester) and any number of readers. Replacement is
//! an atomic swap of an `Option<Frame>`, so readers see either the old frame
//! or the new one, never a partial write.

use bytes::Bytes;
use tokio::sync::watch;
use tokio::time::Instant;

use super::frame::Frame;

/// Concurrency-safe holder of the current frame
pub struct FrameStore {
    tx: watch::Sender<Option<Frame>>,
}

impl FrameStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Replace the current frame
    pub fn set(&self, frame: Frame) {
        self.tx.send_replace(Some(frame));
    }

    /// Wrap `data` in a frame stamped now with the next sequence number and
    /// make it current
    pub fn publish(&self, data: Bytes) -> Frame {
        let frame = Frame::new(data, self.sequence() + 1);
        self.set(frame.clone());
        frame
    }

    /// Snapshot of the current frame, if any has been published
    pub fn get(&self) -> Option<Frame> {
        self.tx.borrow().clone()
    }

    /// Sequence number of the current frame (0 before the first frame)
    pub fn sequence(&self) -> u64 {
        self.tx.borrow().as_ref().map_or(0, |f| f.sequence)
    }

    /// Capture time of the current frame
    pub fn last_update(&self) -> Option<Instant> {
        self.tx.borrow().as_ref().map(|f| f.captured_at)
    }

    /// Watch for frame replacements
    pub fn subscribe(&self) -> watch::Receiver<Option<Frame>> {
        self.tx.subscribe()
    }
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_store() {
        let store = FrameStore::new();
        assert!(store.get().is_none());
        assert_eq!(store.sequence(), 0);
        assert!(store.last_update().is_none());
    }

    #[tokio::test]
    async fn test_publish_replaces_frame() {
        let store = FrameStore::new();

        let first = store.publish(Bytes::from_static(&[0xFF, 0xD8, 0x01, 0xFF, 0xD9]));
        assert_eq!(first.sequence, 1);

        let second = store.publish(Bytes::from_static(&[0xFF, 0xD8, 0x02, 0xFF, 0xD9]));
        assert_eq!(second.sequence, 2);

        let current = store.get().unwrap();
        assert_eq!(current.sequence, 2);
        assert_eq!(current.data[2], 0x02);
        assert_eq!(store.last_update(), Some(second.captured_at));
    }

    #[tokio::test]
    async fn test_subscriber_sees_replacement() {
        let store = FrameStore::new();
        let mut rx = store.subscribe();

        store.publish(Bytes::from_static(b"jpeg"));
        rx.changed().await.unwrap();

        let seen = rx.borrow().clone().unwrap();
        assert_eq!(seen.data, Bytes::from_static(b"jpeg"));
    }
}
