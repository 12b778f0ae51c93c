//! Timing strings
//!
//! A timing is `<integer><unit>`:
//! - `m`: minutes
//! - `H` (or `h`): hours
//! - `D`: days
//! - `W`: weeks
//! - `M`: calendar months
//! - `Y`: calendar years
//!
//! Months and years are projected forward from a reference instant, so "1M"
//! starting on January 31st is shorter than "1M" starting on March 1st.
//! Anything that does not parse, or that would put the due time past the
//! last representable date, falls back to one hour.

use std::sync::OnceLock;

use chrono::{DateTime, Months, TimeDelta, Utc};
use regex::Regex;

/// Milliseconds used for malformed timings (one hour)
pub const FALLBACK_MILLIS: i64 = 3_600_000;

fn timing_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)([mhHDWMY])$").ok())
        .as_ref()
}

/// Convert a timing string to a duration starting at `now`
pub fn timing_to_duration(timing: &str, now: DateTime<Utc>) -> TimeDelta {
    match parse_timing(timing.trim(), now) {
        Some(delta) => delta,
        None => {
            log::debug!("Unrecognized timing '{}', using 1 hour", timing);
            TimeDelta::milliseconds(FALLBACK_MILLIS)
        }
    }
}

/// Same as [`timing_to_duration`], in milliseconds
pub fn timing_to_duration_millis(timing: &str, now: DateTime<Utc>) -> i64 {
    timing_to_duration(timing, now).num_milliseconds()
}

fn parse_timing(timing: &str, now: DateTime<Utc>) -> Option<TimeDelta> {
    let caps = timing_regex()?.captures(timing)?;
    let amount: i64 = caps.get(1)?.as_str().parse().ok()?;

    let delta = match caps.get(2)?.as_str() {
        "m" => TimeDelta::try_minutes(amount),
        "h" | "H" => TimeDelta::try_hours(amount),
        "D" => TimeDelta::try_days(amount),
        "W" => TimeDelta::try_weeks(amount),
        "M" => add_months(now, amount),
        "Y" => add_months(now, amount.checked_mul(12)?),
        _ => None,
    }?;

    // The due time must stay representable
    now.checked_add_signed(delta)?;
    Some(delta)
}

fn add_months(now: DateTime<Utc>, months: i64) -> Option<TimeDelta> {
    let months = u32::try_from(months).ok()?;
    let then = now.checked_add_months(Months::new(months))?;
    Some(then - now)
}
