use chrono::{DateTime, Utc};

use crate::CoreError;

/// Timestamps are persisted as milliseconds since the Unix epoch.
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub fn from_millis(ms: i64) -> Result<DateTime<Utc>, CoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| CoreError::InvalidData(format!("timestamp out of range: {ms}")))
}

/// Current wall-clock time truncated to millisecond precision, so values
/// survive a round trip through storage unchanged.
pub fn now_millis() -> Result<DateTime<Utc>, CoreError> {
    from_millis(to_millis(Utc::now()))
}
