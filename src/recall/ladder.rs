//! Stop ladder
//!
//! The ordered sequence of intervals an item climbs as the user keeps
//! recalling it. Stops are 1-based; positions past the end stay on the last
//! (longest) interval.

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use super::timing::timing_to_duration;

/// Ladder used when nothing else is configured
pub const DEFAULT_STOP_LADDER: &str = "10m,1h,1D,1W,1M,4M";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LadderError {
    #[error("Stop ladder must contain at least one timing")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopLadder {
    timings: Vec<String>,
}

impl StopLadder {
    /// Parse a comma-separated list of timings such as `"10m,1h,1D"`
    pub fn parse(config: &str) -> Result<Self, LadderError> {
        let timings: Vec<String> = config
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        Self::from_timings(timings)
    }

    pub fn from_timings(timings: Vec<String>) -> Result<Self, LadderError> {
        if timings.is_empty() {
            return Err(LadderError::Empty);
        }
        Ok(Self { timings })
    }

    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn timings(&self) -> &[String] {
        &self.timings
    }

    /// Clamp a stop number into `[1, len]`
    pub fn clamp(&self, stop: usize) -> usize {
        stop.clamp(1, self.len())
    }

    pub fn is_final(&self, stop: usize) -> bool {
        stop >= self.len()
    }

    /// Timing string for a stop (clamped)
    pub fn timing_at(&self, stop: usize) -> &str {
        &self.timings[self.clamp(stop) - 1]
    }

    /// Interval for a stop, measured from `from`
    pub fn duration_at(&self, stop: usize, from: DateTime<Utc>) -> TimeDelta {
        timing_to_duration(self.timing_at(stop), from)
    }

    /// When an item sitting on `stop` since `from` becomes due
    pub fn due_after(&self, stop: usize, from: DateTime<Utc>) -> DateTime<Utc> {
        from.checked_add_signed(self.duration_at(stop, from))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl Default for StopLadder {
    fn default() -> Self {
        Self {
            timings: DEFAULT_STOP_LADDER
                .split(',')
                .map(str::to_string)
                .collect(),
        }
    }
}

impl std::fmt::Display for StopLadder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.timings.join(","))
    }
}
