use chrono::{DateTime, Local, Utc};

use parla_lib::recall::{format_countdown, RecallItem, StopLadder};

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// "3/6" style progress, with a marker on the last stop
pub fn progress(item: &RecallItem, ladder: &StopLadder) -> String {
    let marker = if ladder.is_final(item.current_stop_number) { "*" } else { "" };
    format!("{}/{}{}", item.current_stop_number, ladder.len(), marker)
}

/// Human readable due column
pub fn due_label(item: &RecallItem, now: DateTime<Utc>, use_color: bool) -> String {
    if item.is_overdue(now) {
        let late = format_countdown(now - item.next_event_time);
        let text = if late == "now" { "due".to_string() } else { format!("due ({} late)", late) };
        paint(&text, Color::RED, use_color)
    } else {
        let text = format!("in {}", format_countdown(item.time_until_due(now)));
        paint(&text, Color::GREEN, use_color)
    }
}

pub fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Render items as an aligned table
pub fn render_table(
    items: &[RecallItem],
    ladder: &StopLadder,
    now: DateTime<Utc>,
    use_color: bool,
) -> String {
    let word_width = items
        .iter()
        .map(|i| i.key.chars().count())
        .max()
        .unwrap_or(4)
        .clamp(4, 30);
    let stop_width = 6;
    let next_width = 16;

    let mut lines = Vec::new();
    let header = format!(
        "{:<ww$} {:<sw$} {:<nw$} {}",
        "Word",
        "Stop",
        "Next check",
        "Due",
        ww = word_width,
        sw = stop_width,
        nw = next_width,
    );
    lines.push(paint(&header, Color::BOLD, use_color));

    for item in items {
        let mut line = format!(
            "{:<ww$} {:<sw$} {:<nw$} {}",
            truncate(&item.key, word_width),
            progress(item, ladder),
            local_time(item.next_event_time),
            due_label(item, now, use_color),
            ww = word_width,
            sw = stop_width,
            nw = next_width,
        );
        if !item.additional_text.is_empty() {
            line.push_str(&paint(&format!("  {}", item.additional_text), Color::GRAY, use_color));
        }
        lines.push(line);
    }

    lines.join("\n")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

/// JSON shape of an item for `--format json`
pub fn item_json(item: &RecallItem, ladder: &StopLadder, now: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "key": item.key,
        "currentStopNumber": item.current_stop_number,
        "ladderLength": ladder.len(),
        "recallState": item.recall_state,
        "overdue": item.is_overdue(now),
        "prevEventTime": item.prev_event_time.to_rfc3339(),
        "nextEventTime": item.next_event_time.to_rfc3339(),
        "dueIn": format_countdown(item.time_until_due(now)),
        "additionalText": item.additional_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("gato", 10), "gato");
        assert_eq!(truncate("ferrocarril", 6), "ferro…");
    }

    #[test]
    fn test_due_label_without_color() {
        let ladder = StopLadder::parse("10m,1h").unwrap();
        let start = Utc.timestamp_millis_opt(0).unwrap();
        let item = RecallItem::new("x".to_string(), &ladder, start);

        assert_eq!(due_label(&item, start, false), "in 10m");
        assert_eq!(due_label(&item, item.next_event_time, false), "due");
        assert_eq!(
            due_label(&item, item.next_event_time + chrono::TimeDelta::hours(2), false),
            "due (2h late)"
        );
        assert_eq!(progress(&item, &ladder), "1/2");
    }
}
