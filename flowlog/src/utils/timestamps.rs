//! Timestamp formatting for shipped documents.

use chrono::{DateTime, Utc};

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats a timestamp with millisecond precision and a `Z` suffix.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use flowlog::utils::millis_timestamp;
///
/// let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
/// assert_eq!(millis_timestamp(&ts), "2023-11-14T22:13:20.123Z");
/// ```
#[must_use]
pub fn millis_timestamp(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
