//! Recall scheduling for vocabulary words
//!
//! This module provides:
//! - Timing strings ("10m", "1D", "4M") and the stop ladder built from them
//! - Per-word recall state with due-time tracking
//! - The scheduler owning the collection, with write-through persistence
//!   and snapshot subscriptions

pub mod bus;
pub mod clock;
pub mod ladder;
pub mod models;
pub mod scheduler;
pub mod timing;
pub mod writer;

pub use bus::{Snapshot, SnapshotBus, SnapshotSubscriber};
pub use clock::{Clock, ManualClock, SystemClock};
pub use ladder::{LadderError, StopLadder, DEFAULT_STOP_LADDER};
pub use models::*;
pub use scheduler::{spawn_refresh_loop, RecallError, RecallScheduler};
pub use timing::{timing_to_duration, timing_to_duration_millis};
pub use writer::sheet_storage_key;
