//! Timestamp helpers. Persisted timestamps are epoch milliseconds.

use std::sync::atomic::{AtomicU64, Ordering};
use time::{Duration, OffsetDateTime};

static LAST_NANOS: AtomicU64 = AtomicU64::new(0);

/// Convert a date-time to epoch milliseconds.
pub fn to_millis(at: OffsetDateTime) -> i64 {
    // Saturate instead of wrapping for dates far outside the i64 millisecond range
    i64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    to_millis(OffsetDateTime::now_utc())
}

/// Current time in epoch nanoseconds, used to keep append-only keys unique.
///
/// Strictly increasing within the process, even when the clock resolution is
/// coarser than a nanosecond or the clock steps back.
pub fn now_nanos() -> i128 {
    let now = u64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos()).unwrap_or(0);
    let previous = LAST_NANOS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or_else(|last| last);
    i128::from(now.max(previous.saturating_add(1)))
}

/// Epoch milliseconds for `days` days before now.
pub fn days_ago_millis(days: u32) -> i64 {
    to_millis(OffsetDateTime::now_utc() - Duration::days(i64::from(days)))
}
