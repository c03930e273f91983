//! Timestamp helpers shared by capabilities and sinks.

use chrono::{DateTime, SecondsFormat, Utc};

/// Layout used in output file names: `2024-01-31_13_05_09`.
pub const FILE_STAMP_FORMAT: &str = "%Y-%m-%d_%H_%M_%S";

/// Current wall-clock time in UTC.
#[inline]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// RFC 3339 with nanosecond precision, e.g. `2024-01-31T13:05:09.123456789Z`.
pub fn format_rfc3339_nanos(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// File-name-safe timestamp (no colons).
pub fn format_file_stamp(ts: &DateTime<Utc>) -> String {
    ts.format(FILE_STAMP_FORMAT).to_string()
}
