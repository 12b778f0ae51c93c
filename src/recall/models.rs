//! Data models for recall tracking

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::ladder::StopLadder;

/// Whether an item is waiting for its next check or already due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecallState {
    #[default]
    Waiting,
    Overdue,
}

impl RecallState {
    /// Classify an item due at `next_event_time`
    pub fn at(next_event_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now >= next_event_time {
            Self::Overdue
        } else {
            Self::Waiting
        }
    }
}

/// A vocabulary word being tracked for recall
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallItem {
    pub key: String,
    /// 1-based position on the stop ladder
    pub current_stop_number: usize,
    /// When the item becomes due
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub next_event_time: DateTime<Utc>,
    /// Creation or last confirmed recall
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub prev_event_time: DateTime<Utc>,
    /// Cached classification; `is_overdue` is authoritative
    #[serde(default)]
    pub recall_state: RecallState,
    #[serde(default)]
    pub additional_text: String,
}

impl RecallItem {
    /// A freshly focused item on the first stop
    pub fn new(key: String, ladder: &StopLadder, now: DateTime<Utc>) -> Self {
        let current_stop_number = ladder.clamp(1);
        Self {
            key,
            current_stop_number,
            next_event_time: ladder.due_after(current_stop_number, now),
            prev_event_time: now,
            recall_state: RecallState::Waiting,
            additional_text: String::new(),
        }
    }

    /// Move one stop up the ladder after a successful recall
    pub fn advance(&mut self, ladder: &StopLadder, now: DateTime<Utc>) {
        self.current_stop_number = ladder.clamp(self.current_stop_number.saturating_add(1));
        self.prev_event_time = now;
        self.next_event_time = ladder.due_after(self.current_stop_number, now);
        self.recall_state = RecallState::Waiting;
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        RecallState::at(self.next_event_time, now) == RecallState::Overdue
    }

    /// Recompute the cached state, returning true if it changed
    pub fn refresh_state(&mut self, now: DateTime<Utc>) -> bool {
        let state = RecallState::at(self.next_event_time, now);
        let changed = state != self.recall_state;
        self.recall_state = state;
        changed
    }

    /// Time left until the item is due (zero once overdue)
    pub fn time_until_due(&self, now: DateTime<Utc>) -> TimeDelta {
        (self.next_event_time - now).max(TimeDelta::zero())
    }
}

/// Format a countdown compactly for display
pub fn format_countdown(delta: TimeDelta) -> String {
    let secs = delta.num_seconds();
    if secs <= 0 {
        "now".to_string()
    } else if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3_600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h", secs / 3_600)
    } else if secs < 7 * 86_400 {
        format!("{}d", secs / 86_400)
    } else if secs < 30 * 86_400 {
        format!("{}w", secs / (7 * 86_400))
    } else if secs < 365 * 86_400 {
        format!("{}mo", secs / (30 * 86_400))
    } else {
        format!("{}y", secs / (365 * 86_400))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn millis(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_new_item_due_after_first_stop() {
        let ladder = StopLadder::parse("10m,1h").unwrap();
        let item = RecallItem::new("gato".to_string(), &ladder, millis(0));

        assert_eq!(item.current_stop_number, 1);
        assert_eq!(item.prev_event_time, millis(0));
        assert_eq!(item.next_event_time, millis(600_000));
        assert_eq!(item.recall_state, RecallState::Waiting);
        assert!(item.additional_text.is_empty());
    }

    #[test]
    fn test_state_flips_at_due_time() {
        let ladder = StopLadder::parse("10m").unwrap();
        let mut item = RecallItem::new("perro".to_string(), &ladder, millis(0));

        assert!(!item.is_overdue(millis(599_999)));
        assert!(item.is_overdue(millis(600_000)));

        assert!(!item.refresh_state(millis(1_000)));
        assert!(item.refresh_state(millis(600_000)));
        assert_eq!(item.recall_state, RecallState::Overdue);
        assert!(!item.refresh_state(millis(700_000)));
    }

    #[test]
    fn test_serialized_shape() {
        let ladder = StopLadder::parse("10m").unwrap();
        let item = RecallItem::new("casa".to_string(), &ladder, millis(1_000));
        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "key": "casa",
                "currentStopNumber": 1,
                "nextEventTime": 601_000,
                "prevEventTime": 1_000,
                "recallState": "Waiting",
                "additionalText": "",
            })
        );
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let item: RecallItem = serde_json::from_str(
            r#"{"key":"sol","currentStopNumber":3,"nextEventTime":5,"prevEventTime":1}"#,
        )
        .unwrap();
        assert_eq!(item.recall_state, RecallState::Waiting);
        assert_eq!(item.additional_text, "");
        assert_eq!(item.next_event_time, millis(5));
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(TimeDelta::zero()), "now");
        assert_eq!(format_countdown(TimeDelta::seconds(-5)), "now");
        assert_eq!(format_countdown(TimeDelta::seconds(45)), "45s");
        assert_eq!(format_countdown(TimeDelta::minutes(12)), "12m");
        assert_eq!(format_countdown(TimeDelta::hours(3)), "3h");
        assert_eq!(format_countdown(TimeDelta::days(2)), "2d");
        assert_eq!(format_countdown(TimeDelta::days(14)), "2w");
        assert_eq!(format_countdown(TimeDelta::days(60)), "2mo");
        assert_eq!(format_countdown(TimeDelta::days(400)), "1y");
    }
}
