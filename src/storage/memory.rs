use std::collections::HashMap;
use std::sync::Mutex;

use super::file_storage::Result;
use super::KeyValueStore;

/// In-process key-value store
///
/// Values live only as long as the store. Every `set` is recorded so callers
/// can inspect the write history.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<(String, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All writes applied so far, oldest first
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Number of writes applied to a key
    pub fn write_count(&self, key: &str) -> usize {
        self.writes
            .lock()
            .map(|w| w.iter().filter(|(k, _)| k == key).count())
            .unwrap_or(0)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
        if let Ok(mut writes) = self.writes.lock() {
            writes.push((key.to_string(), value.to_string()));
        }
        Ok(())
    }
}
