//! Cyclic calendar features derived from an event timestamp.
//!
//! Any timestamp that is absent or fails to parse yields 0.0 for every
//! feature. No error is reported; callers treat 0.0 as "unknown".

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Hour (0-23) and weekday (Monday = 0) as written in the timestamp.
///
/// Offsets are respected but not converted: `2024-03-02T23:00:00+05:00`
/// is hour 23 on a Saturday.
fn hour_and_weekday(timestamp: &str) -> Option<(u32, u32)> {
    let ts = timestamp.trim();
    if ts.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some((dt.hour(), dt.weekday().num_days_from_monday()));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(ts, format) {
            return Some((dt.hour(), dt.weekday().num_days_from_monday()));
        }
    }

    NaiveDate::parse_from_str(ts, "%Y-%m-%d")
        .ok()
        .map(|d| (0, d.weekday().num_days_from_monday()))
}

/// Hour of day scaled to [0, 1) as `hour / 24`
pub fn encode_time_of_day(timestamp: Option<&str>) -> f64 {
    timestamp
        .and_then(hour_and_weekday)
        .map(|(hour, _)| f64::from(hour) / 24.0)
        .unwrap_or(0.0)
}

/// Day of week scaled to [0, 1] as `weekday / 6` (Monday = 0, Sunday = 6)
pub fn encode_day_of_week(timestamp: Option<&str>) -> f64 {
    timestamp
        .and_then(hour_and_weekday)
        .map(|(_, weekday)| f64::from(weekday) / 6.0)
        .unwrap_or(0.0)
}

/// 1.0 on Saturday or Sunday, else 0.0
pub fn is_weekend(timestamp: Option<&str>) -> f64 {
    match timestamp.and_then(hour_and_weekday) {
        Some((_, weekday)) if weekday >= 5 => 1.0,
        _ => 0.0,
    }
}
