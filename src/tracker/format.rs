//! Display strings for the session history.

use crate::db::{SessionRecord, SleepQuality};

const ONE_MINUTE_MS: i64 = 60 * 1000;
const ONE_HOUR_MS: i64 = 60 * ONE_MINUTE_MS;

pub fn quality_label(quality: i32) -> &'static str {
    SleepQuality::try_from(quality)
        .map(SleepQuality::label)
        .unwrap_or("--")
}

/// "42 seconds on Monday", "17 minutes on Monday", "8 hours on Monday".
pub fn format_duration(record: &SessionRecord) -> String {
    let duration = record.duration_ms();
    let weekday = record
        .started_at()
        .map(|start| start.format("%A").to_string())
        .unwrap_or_else(|| "an unknown day".to_string());

    if duration < ONE_MINUTE_MS {
        format!("{} seconds on {weekday}", duration / 1000)
    } else if duration < ONE_HOUR_MS {
        format!("{} minutes on {weekday}", duration / ONE_MINUTE_MS)
    } else {
        format!("{} hours on {weekday}", duration / ONE_HOUR_MS)
    }
}

pub fn format_night(record: &SessionRecord) -> String {
    let started = record
        .started_at()
        .map(|start| start.format("%a %Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown start".to_string());

    if record.is_active() {
        return format!("#{} {started} | sleeping", record.id);
    }

    format!(
        "#{} {started} | {} | {}",
        record.id,
        format_duration(record),
        quality_label(record.quality)
    )
}

/// Pure projection of the history, in the same order.
pub fn format_history(history: &[SessionRecord]) -> Vec<String> {
    history.iter().map(format_night).collect()
}
