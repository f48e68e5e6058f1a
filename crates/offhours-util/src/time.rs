//! Time utilities for offhoursd
//!
//! All scheduling arithmetic happens on epoch milliseconds; this module is
//! the single place that reads the system clock.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `OFFHOURS_MOCK_TIME` environment variable can be set
//! to override the system time. The mock clock starts at the given UTC time
//! and advances at the normal rate, which makes it possible to watch a
//! scheduled weekday start or a window expiry without waiting for it.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! OFFHOURS_MOCK_TIME="2025-12-22 07:59:30" ./offhoursd
//! ```

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "OFFHOURS_MOCK_TIME";

/// Format accepted by `OFFHOURS_MOCK_TIME`
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const MILLIS_PER_SECOND: i64 = 1000;
pub const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
pub const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;

/// Offset between mock time and real time, computed once per process.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Utc::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match parse_mock_time(&mock_time_str) {
                    Some(mock_dt) => {
                        let offset = mock_dt.signed_duration_since(Utc::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    None => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = MOCK_TIME_FORMAT,
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Parse a mock time string as a UTC instant.
pub fn parse_mock_time(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, MOCK_TIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Current time in UTC, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Utc> {
    let real_now = Utc::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    now().timestamp_millis()
}

/// Convert epoch milliseconds to a zoned date-time.
///
/// Out-of-range values clamp to the epoch.
pub fn from_millis<Tz: TimeZone>(millis: i64, tz: &Tz) -> DateTime<Tz> {
    let utc = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default();
    utc.with_timezone(tz)
}
