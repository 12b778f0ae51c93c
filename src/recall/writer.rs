//! Ordered write-through persistence
//!
//! Mutations enqueue full-collection writes; a single background task applies
//! them to the store strictly in enqueue order.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::bus::Snapshot;
use super::models::RecallItem;
use crate::storage::KeyValueStore;

/// Store key holding the recall collection of a content sheet
pub fn sheet_storage_key(sheet: &str) -> String {
    format!("recall_items_{}", sheet)
}

/// Serialize a collection to its persisted JSON form
pub fn encode_items(items: &[RecallItem]) -> Result<String, serde_json::Error> {
    serde_json::to_string(items)
}

/// Parse a persisted collection
pub fn decode_items(data: &str) -> Result<Vec<RecallItem>, serde_json::Error> {
    serde_json::from_str(data)
}

#[derive(Debug)]
enum WriteRequest {
    Persist { key: String, items: Snapshot },
    Flush(oneshot::Sender<()>),
}

/// Handle for the background writer task
pub struct PersistenceQueue {
    sender: mpsc::UnboundedSender<WriteRequest>,
}

impl PersistenceQueue {
    /// Spawn the writer task; must be called inside a tokio runtime
    ///
    /// The task runs until every handle is dropped and the queue is drained.
    pub fn start(store: Arc<dyn KeyValueStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            writer_loop(store, rx).await;
        });

        Self { sender: tx }
    }

    /// Queue a full write of `items` under `key`
    pub fn persist(&self, key: String, items: Snapshot) {
        if self
            .sender
            .send(WriteRequest::Persist { key, items })
            .is_err()
        {
            log::error!("Recall writer is gone, dropping write");
        }
    }

    /// Wait until every write queued before this call has been applied
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(WriteRequest::Flush(tx)).is_err() {
            return;
        }
        let _ = rx.await;
    }
}

async fn writer_loop(
    store: Arc<dyn KeyValueStore>,
    mut receiver: mpsc::UnboundedReceiver<WriteRequest>,
) {
    while let Some(request) = receiver.recv().await {
        match request {
            WriteRequest::Persist { key, items } => write_items(store.as_ref(), &key, &items),
            WriteRequest::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    log::debug!("Recall writer: queue closed");
}

fn write_items(store: &dyn KeyValueStore, key: &str, items: &[RecallItem]) {
    let data = match encode_items(items) {
        Ok(data) => data,
        Err(e) => {
            log::error!("Failed to serialize recall items for {}: {}", key, e);
            return;
        }
    };

    match store.set(key, &data) {
        Ok(()) => log::debug!("Persisted {} recall items to {}", items.len(), key),
        Err(e) => log::error!("Failed to persist recall items to {}: {}", key, e),
    }
}
