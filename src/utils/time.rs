//! Wall-clock helpers for ICMP timestamp messages.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds in one UTC day
pub const MILLIS_PER_DAY: u64 = 86_400_000;

/// Current time as milliseconds since midnight UTC, the unit carried by
/// ICMP timestamp fields.
///
/// A clock set before the Unix epoch reads as midnight.
pub fn millis_since_midnight_utc() -> u32 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    millis_of_day(since_epoch)
}

/// Reduce a duration since the Unix epoch to milliseconds since midnight UTC
pub fn millis_of_day(since_epoch: Duration) -> u32 {
    (since_epoch.as_millis() % u128::from(MILLIS_PER_DAY)) as u32
}
