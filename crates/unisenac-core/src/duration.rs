//! Human-readable duration formatting shared by server replies and client stats.

use std::time::Duration;

use chrono::{DateTime, Local};

/// Formats a duration as `"1d 2h 3m 4s"`.
///
/// Zero components are omitted; a zero duration renders as `"0s"`.
/// Sub-second precision is truncated.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }

    parts.join(" ")
}

/// Time elapsed between `since` and `now`, clamped to zero if the clock
/// went backwards.
pub fn elapsed_since(since: DateTime<Local>, now: DateTime<Local>) -> Duration {
    (now - since).to_std().unwrap_or_default()
}
