//! Timestamp utilities

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Current UTC timestamp, truncated to milliseconds
///
/// Rows store timestamps as TEXT; truncating keeps the value identical after a
/// write/read cycle.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Fixed-width storage form, `2024-03-01T12:00:00.000Z`
///
/// Every stored timestamp has the same width so text comparison in ORDER BY
/// matches chronological order.
pub fn to_db(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
