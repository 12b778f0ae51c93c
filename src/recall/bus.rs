//! Snapshot bus using tokio broadcast channel
//!
//! Every mutation of the recall collection publishes the full new snapshot.
//! Subscribers receive snapshots in the order they were published.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::models::RecallItem;

/// Immutable view of the recall collection
pub type Snapshot = Arc<Vec<RecallItem>>;

/// Default channel capacity
const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct SnapshotBus {
    sender: broadcast::Sender<Snapshot>,
}

impl SnapshotBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every snapshot published after this call
    pub fn subscribe(&self) -> SnapshotSubscriber {
        SnapshotSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish a snapshot; dropped silently when nobody listens
    pub fn publish(&self, snapshot: Snapshot) {
        let _ = self.sender.send(snapshot);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SnapshotBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SnapshotSubscriber {
    receiver: broadcast::Receiver<Snapshot>,
}

impl SnapshotSubscriber {
    /// Wait for the next snapshot
    ///
    /// Returns None once the bus is gone. A subscriber that fell behind skips
    /// ahead to the oldest snapshot still buffered.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("Recall subscriber lagged by {} snapshots", n);
                    continue;
                }
            }
        }
    }

    /// Take a snapshot if one is waiting
    pub fn try_recv(&mut self) -> Option<Snapshot> {
        loop {
            match self.receiver.try_recv() {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    log::warn!("Recall subscriber lagged by {} snapshots", n);
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}
