//! Parla: vocabulary recall scheduling
//!
//! Words the user focuses on climb a ladder of growing intervals each time
//! they are recalled. Progress is kept per content sheet in a key-value store.

pub mod recall;
pub mod settings;
pub mod storage;

pub use recall::{RecallError, RecallItem, RecallScheduler, RecallState, StopLadder};
pub use settings::{Settings, SettingsError};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
