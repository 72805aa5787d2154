//! Millisecond timestamp helpers.

use chrono::{DateTime, Utc};

pub const MS_PER_HOUR: i64 = 3_600_000;

/// Convert an hour count to milliseconds, rounding to the nearest ms.
pub fn hours_to_ms(hours: f64) -> i64 {
    (hours * MS_PER_HOUR as f64).round() as i64
}

fn ms_to_datetime(ts_ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
}

/// RFC 3339 rendering for diagnostics; falls back to the raw number.
pub fn fmt_ts_ms(ts_ms: i64) -> String {
    match ms_to_datetime(ts_ms) {
        Some(dt) => dt.to_rfc3339(),
        None => format!("{ts_ms}ms"),
    }
}
