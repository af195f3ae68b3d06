//! Viewer registry
//!
//! Tracks the viewers of one camera. Membership changes from three places:
//! the accept path (insert), the broadcaster on a failed delivery (remove),
//! and a serve task tearing down after a socket error or disconnect (remove).
//! Iteration works on a snapshot, so removals during a broadcast neither
//! deadlock nor disturb unrelated viewers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Instant;

use super::error::ClientWriteError;
use super::frame::ClientId;
use super::sink::FrameSink;
use super::store::FrameStore;
use crate::mjpeg::encode_part;
use crate::stats::RelayStats;

/// A registered viewer
struct ClientEntry {
    sink: Arc<dyn FrameSink>,
    registered_at: Instant,
}

/// Registry of the viewers attached to one camera
pub struct ClientRegistry {
    clients: RwLock<HashMap<ClientId, ClientEntry>>,
    next_id: AtomicU64,
    store: Arc<FrameStore>,
    stats: Arc<RelayStats>,
}

impl ClientRegistry {
    /// Create a registry that greets new viewers from `store`
    pub fn new(store: Arc<FrameStore>) -> Self {
        Self::with_stats(store, Arc::new(RelayStats::new()))
    }

    /// Create a registry reporting into shared stats
    pub fn with_stats(store: Arc<FrameStore>, stats: Arc<RelayStats>) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            store,
            stats,
        }
    }

    /// Register a viewer
    ///
    /// If a frame is already stored it is delivered to the new sink before
    /// this returns. The store is read under the write lock, so no broadcast
    /// can slip an older frame in after it. A sink that rejects that first
    /// delivery is closed and not kept, and the error is returned.
    pub async fn register(
        &self,
        sink: Arc<dyn FrameSink>,
    ) -> Result<ClientId, ClientWriteError> {
        let mut clients = self.clients.write().await;
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));

        if let Some(frame) = self.store.get() {
            if let Err(e) = sink.deliver(encode_part(&frame.data)) {
                tracing::debug!(client_id = %id, error = %e, "Initial frame delivery failed");
                sink.close();
                return Err(e);
            }
        }

        clients.insert(
            id,
            ClientEntry {
                sink,
                registered_at: Instant::now(),
            },
        );
        self.stats.record_client_registered();

        tracing::debug!(client_id = %id, clients = clients.len(), "Client registered");
        Ok(id)
    }

    /// Remove a viewer and signal its serve task
    ///
    /// Returns false if the viewer was already gone.
    pub async fn unregister(&self, id: ClientId) -> bool {
        let removed = self.clients.write().await.remove(&id);

        match removed {
            Some(entry) => {
                entry.sink.close();
                self.stats.record_client_dropped();
                tracing::debug!(
                    client_id = %id,
                    connected_ms = entry.registered_at.elapsed().as_millis() as u64,
                    "Client unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Snapshot of current members
    pub async fn members(&self) -> Vec<(ClientId, Arc<dyn FrameSink>)> {
        self.snapshot().await.1
    }

    /// Snapshot of current members together with the store sequence
    ///
    /// Both are read under one lock. No member in the snapshot has been sent
    /// a frame newer than the returned sequence.
    pub async fn snapshot(&self) -> (u64, Vec<(ClientId, Arc<dyn FrameSink>)>) {
        let clients = self.clients.read().await;
        let members = clients
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(&entry.sink)))
            .collect();
        (self.store.sequence(), members)
    }

    /// Call `f` for each current member
    ///
    /// `f` runs without the registry lock held, so it may race with
    /// `register`/`unregister` freely.
    pub async fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(ClientId, &Arc<dyn FrameSink>),
    {
        for (id, sink) in self.members().await {
            f(id, &sink);
        }
    }

    /// Whether a viewer is registered
    pub async fn contains(&self, id: ClientId) -> bool {
        self.clients.read().await.contains_key(&id)
    }

    /// Number of registered viewers
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Whether no viewers are registered
    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Remove and close every viewer
    pub async fn clear(&self) {
        let drained: Vec<ClientEntry> = self
            .clients
            .write()
            .await
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        for entry in drained {
            entry.sink.close();
            self.stats.record_client_dropped();
        }
    }
}
