//! Time source for the recall engine

use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
///
/// Public so embedders can drive a scheduler through scripted time, e.g.
/// replaying a review session or testing their own front end.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock starting at the given epoch milliseconds
    pub fn at_millis(millis: i64) -> Self {
        Self::new(Utc.timestamp_millis_opt(millis).single().unwrap_or_default())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut current) = self.now.lock() {
            *current = now;
        }
    }

    pub fn set_millis(&self, millis: i64) {
        if let Some(now) = Utc.timestamp_millis_opt(millis).single() {
            self.set(now);
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        if let Ok(mut current) = self.now.lock() {
            if let Some(next) = current.checked_add_signed(delta) {
                *current = next;
            }
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_default()
    }
}
