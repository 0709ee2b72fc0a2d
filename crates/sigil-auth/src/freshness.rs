//! Request timestamp freshness.
//!
//! Timestamps use the ISO 8601 basic format in UTC (`YYYYMMDDTHHMMSSZ`). A
//! request is fresh when its timestamp is within `max_age` of the verifier's
//! clock in either direction, which bounds both stale replays and clients
//! forging timestamps in the future.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Timestamp format of the `x-<namespace>-timestamp` header.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Default tolerated clock skew.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Parse a basic-format UTC timestamp.
///
/// # Examples
///
/// ```
/// use sigil_auth::freshness::parse_timestamp;
///
/// assert!(parse_timestamp("20160122T211203Z").is_some());
/// assert!(parse_timestamp("2016-01-22T21:12:03Z").is_none());
/// ```
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a time the way clients send it.
#[must_use]
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Whether `timestamp` lies within `max_age` of `now`, past or future.
///
/// Unparsable timestamps are never fresh.
#[must_use]
pub fn is_fresh(timestamp: &str, now: DateTime<Utc>, max_age: Duration) -> bool {
    let Some(request_time) = parse_timestamp(timestamp) else {
        return false;
    };
    let Ok(max_age) = chrono::Duration::from_std(max_age) else {
        return true;
    };

    let skew = (now - request_time).abs();
    skew <= max_age
}
