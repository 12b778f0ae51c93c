//! Key-value persistence for recall state
//!
//! The recall engine only needs "get string by key" and "set string by key".
//! A value set is visible to a `get` issued right after it in the same process.

mod file_storage;
mod memory;

pub use file_storage::{FileStore, StorageError};
pub use memory::MemoryStore;

/// String key-value store used to persist serialized collections
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
