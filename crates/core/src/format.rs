//! Display formatting for job status and timestamps.
//!
//! All functions here are deterministic: the current time is always passed
//! in by the caller.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::job::JobStatus;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Status badges
// ---------------------------------------------------------------------------

/// Style class used for any status outside the known set.
pub const CLASS_UNKNOWN: &str = "badge-unknown";

/// Label and style class for a status badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBadge {
    pub label: String,
    pub class: &'static str,
}

/// Map a job status to its badge.
///
/// Statuses outside the known set render with [`CLASS_UNKNOWN`] but keep
/// their raw value as the label.
pub fn format_status(status: &JobStatus) -> StatusBadge {
    let (label, class) = match status {
        JobStatus::Queued => ("Queued", "badge-queued"),
        JobStatus::Rendering => ("Rendering", "badge-rendering"),
        JobStatus::Done => ("Done", "badge-done"),
        JobStatus::Error => ("Error", "badge-error"),
        JobStatus::Deleted => ("Deleted", "badge-deleted"),
        JobStatus::Restarted => ("Restarted", "badge-restarted"),
        JobStatus::Unknown => ("Unknown", CLASS_UNKNOWN),
        JobStatus::Other(raw) => (raw.as_str(), CLASS_UNKNOWN),
    };
    StatusBadge {
        label: label.to_string(),
        class,
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;

/// Formats the backend uses for timestamps without an offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a backend timestamp.
///
/// RFC 3339 values keep their offset; values without one are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Relative "time ago" text for a job timestamp, absolute dates in the
/// local time zone.
pub fn time_ago(now: Timestamp, raw: &str) -> String {
    time_ago_in(now, raw, &chrono::Local)
}

/// [`time_ago`] with an explicit zone for the absolute branch.
///
/// - empty input: empty string
/// - unparsable input: returned as-is
/// - `diff < 60s` (including timestamps in the future): `"just now"`
/// - `diff < 1h`: `"N min ago"`
/// - `diff < 1d`: `"N h ago"`
/// - otherwise: `"DD.MM.YYYY HH:MM"` in `zone`
pub fn time_ago_in<Tz>(now: Timestamp, raw: &str, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if raw.trim().is_empty() {
        return String::new();
    }
    let Some(then) = parse_timestamp(raw) else {
        return raw.to_string();
    };

    let diff = (now - then).num_seconds();
    if diff < SECS_PER_MINUTE {
        "just now".to_string()
    } else if diff < SECS_PER_HOUR {
        format!("{} min ago", diff / SECS_PER_MINUTE)
    } else if diff < SECS_PER_DAY {
        format!("{} h ago", diff / SECS_PER_HOUR)
    } else {
        then.with_timezone(zone).format("%d.%m.%Y %H:%M").to_string()
    }
}

/// Compact `YYYY-MM-DD HH:MM` form of a raw backend date, used by the
/// admin render table.
pub fn short_date(raw: &str) -> String {
    raw.replacen('T', " ", 1).chars().take(16).collect()
}
