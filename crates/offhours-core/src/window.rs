//! Uptime window arithmetic
//!
//! Timestamps are epoch milliseconds. A window opens at `last_started` and
//! stays open for a fixed number of hours.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Weekday};
use chrono_tz::Tz;
use offhours_util::{MILLIS_PER_HOUR, MILLIS_PER_SECOND, from_millis};

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// The given date, or the most recent weekday before it
fn weekday_on_or_before(date: NaiveDate) -> NaiveDate {
    let mut date = date;
    while is_weekend(date.weekday()) {
        match date.pred_opt() {
            Some(prev) => date = prev,
            None => break,
        }
    }
    date
}

/// Resolve a local wall-clock time in `tz`.
///
/// Ambiguous times (clocks going back) take the earlier instant; times that
/// fall in a gap (clocks going forward) take the first instant after it.
fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt;
    }

    let after_gap = naive + chrono::Duration::hours(1);
    tz.from_local_datetime(&after_gap)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

fn at_hour(tz: &Tz, date: NaiveDate, hour: u8) -> DateTime<Tz> {
    let naive = date
        .and_hms_opt(u32::from(hour.min(23)), 0, 0)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
    resolve_local(tz, naive)
}

/// Most recent weekday instant at `start_hour:00` that is not after `now`.
///
/// Returns the epoch when no start hour is configured, which never
/// triggers a scheduled start.
pub fn last_scheduled(start_hour: Option<u8>, now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let Some(hour) = start_hour else {
        return from_millis(0, &tz);
    };

    let today = now.date_naive();
    let date = if at_hour(&tz, today, hour) > *now {
        today.pred_opt().unwrap_or(today)
    } else {
        today
    };

    at_hour(&tz, weekday_on_or_before(date), hour)
}

/// `last_scheduled` on epoch milliseconds
pub fn last_scheduled_millis(start_hour: Option<u8>, now: i64, tz: &Tz) -> i64 {
    last_scheduled(start_hour, &from_millis(now, tz)).timestamp_millis()
}

/// Current time for display, e.g. "9:05AM UTC"
pub fn format_clock(now: i64, tz: &Tz) -> String {
    from_millis(now, tz).format("%-I:%M%p %Z").to_string()
}

/// Description of the weekday auto-start rule
pub fn weekday_start_message(start_hour: Option<u8>, now: i64, tz: &Tz) -> String {
    match start_hour {
        Some(hour) => {
            let start = at_hour(tz, from_millis(now, tz).date_naive(), hour);
            format!("Auto start: Mon-Fri, {}", start.format("%-I%p %Z"))
        }
        None => "Auto start disabled".to_string(),
    }
}

/// Length of the uptime window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UptimeWindow {
    hours: u32,
}

impl UptimeWindow {
    /// A window of `hours` hours; zero is treated as one hour
    pub fn new(hours: u32) -> Self {
        Self {
            hours: hours.max(1),
        }
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    fn millis(&self) -> i64 {
        i64::from(self.hours) * MILLIS_PER_HOUR
    }

    fn seconds(&self) -> i64 {
        self.millis() / MILLIS_PER_SECOND
    }

    /// Whole seconds left in the window, never negative
    pub fn remaining_seconds(&self, last_started: i64, now: i64) -> i64 {
        last_started
            .saturating_add(self.millis())
            .saturating_sub(now)
            .max(0)
            / MILLIS_PER_SECOND
    }

    /// Remaining time as "{h}h {mm}m" or "{m}m".
    ///
    /// Empty when the window is closed or `last_started` lies in the future.
    pub fn remaining(&self, last_started: i64, now: i64) -> String {
        let minutes = self.remaining_seconds(last_started, now) / 60;
        let hours = (minutes / 60) % i64::from(self.hours);

        if minutes <= 0 || minutes >= i64::from(self.hours) * 60 {
            String::new()
        } else if hours > 0 {
            format!("{}h {:02}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes % 60)
        }
    }

    /// Whether resources should currently be running
    pub fn is_running(&self, last_started: i64, now: i64) -> bool {
        !self.remaining(last_started, now).is_empty()
    }

    /// Extensions are offered once less than `hours - 1` hours remain
    pub fn can_extend(&self, last_started: i64, now: i64) -> bool {
        self.remaining_seconds(last_started, now) < self.seconds() - 3600
    }

    /// New `last_started` after a one hour extension.
    ///
    /// The start is first clamped to at most one window before `now`; the
    /// extension is dropped if it would put the start at or after `now`.
    pub fn extend(&self, last_started: i64, now: i64) -> i64 {
        let earliest = now.saturating_sub(self.millis());
        let started = last_started.max(earliest);
        let hour_later = started.saturating_add(MILLIS_PER_HOUR);
        if hour_later >= now {
            started
        } else {
            hour_later
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Timelike};
    use offhours_util::MILLIS_PER_MINUTE;

    fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Tz> {
        Tz::UTC.with_ymd_and_hms(2019, 10, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn schedules() {
        // 2019-10-24 is a Thursday
        let thu8am = utc(24, 8, 0);
        let thu9am = utc(24, 9, 0);
        let fri8am = utc(25, 8, 0);
        let fri9am = utc(25, 9, 0);
        let sun10am = utc(27, 10, 0);
        let mon8am = utc(28, 8, 0);

        assert_eq!(last_scheduled(Some(8), &thu9am), thu8am);
        assert_eq!(last_scheduled(Some(9), &fri8am), thu9am);
        assert_eq!(last_scheduled(Some(9), &sun10am), fri9am);
        assert_eq!(last_scheduled(Some(9), &mon8am), fri9am);
    }

    #[test]
    fn schedule_truncates_to_the_hour() {
        let wed_after_8pm = Tz::UTC.with_ymd_and_hms(2019, 11, 13, 20, 32, 17).unwrap();
        let scheduled = last_scheduled(Some(20), &wed_after_8pm);
        assert_eq!(scheduled.to_rfc3339(), "2019-11-13T20:00:00+00:00");
        assert_eq!(scheduled.minute(), 0);
        assert_eq!(scheduled.second(), 0);
    }

    #[test]
    fn weekends_map_to_friday() {
        let friday = NaiveDate::from_ymd_opt(2019, 10, 25).unwrap();
        for hour in 0..24u8 {
            let expected = at_hour(&Tz::UTC, friday, hour);
            for day in [26, 27] {
                for now_hour in [0, 6, 12, 18, 23] {
                    let now = utc(day, now_hour, 30);
                    assert_eq!(
                        last_scheduled(Some(hour), &now),
                        expected,
                        "hour {} at {}",
                        hour,
                        now
                    );
                }
            }
        }
    }

    #[test]
    fn monday_before_start_crosses_whole_weekend() {
        // Monday 00:30, start at 01:00: steps back to Sunday, then to Friday
        let now = utc(28, 0, 30);
        assert_eq!(last_scheduled(Some(1), &now), utc(25, 1, 0));
    }

    #[test]
    fn disabled_schedule_is_epoch() {
        let now = utc(24, 9, 0);
        assert_eq!(last_scheduled(None, &now).timestamp_millis(), 0);
        assert_eq!(last_scheduled_millis(None, now.timestamp_millis(), &Tz::UTC), 0);
    }

    #[test]
    fn schedule_uses_local_hour() {
        // 08:00 in Melbourne on Thu 2019-10-24 (AEDT, UTC+11) is 21:00 UTC Wednesday
        let tz = chrono_tz::Australia::Melbourne;
        let now = tz.with_ymd_and_hms(2019, 10, 24, 9, 0, 0).unwrap();
        let scheduled = last_scheduled(Some(8), &now);
        assert_eq!(scheduled.to_rfc3339(), "2019-10-24T08:00:00+11:00");
        assert_eq!(
            last_scheduled_millis(Some(8), now.timestamp_millis(), &tz),
            Tz::UTC.with_ymd_and_hms(2019, 10, 23, 21, 0, 0).unwrap().timestamp_millis()
        );
    }

    #[test]
    fn schedule_in_spring_forward_gap() {
        // 2019-03-10 02:00 does not exist in New York; the start moves to 03:00
        let tz = chrono_tz::America::New_York;
        let now = tz.with_ymd_and_hms(2019, 3, 11, 12, 0, 0).unwrap();
        let scheduled = last_scheduled(Some(2), &now);
        assert_eq!(scheduled.date_naive(), NaiveDate::from_ymd_opt(2019, 3, 11).unwrap());

        let friday = at_hour(&tz, NaiveDate::from_ymd_opt(2019, 3, 8).unwrap(), 2);
        assert_eq!(friday.hour(), 2);

        let gap = at_hour(&tz, NaiveDate::from_ymd_opt(2019, 3, 10).unwrap(), 2);
        assert_eq!(gap.hour(), 3);
    }

    #[test]
    fn calc_remaining() {
        let window = UptimeWindow::new(10);
        let m = MILLIS_PER_MINUTE;
        let start = 1_573_261_444_114;
        let stop = start + 10 * 60 * m;

        assert_eq!(window.remaining(0, stop), "");
        assert_eq!(window.remaining(stop - m + 1, start), "");
        assert_eq!(window.remaining(start, stop - m), "1m");
        assert_eq!(window.remaining(start, stop - 5 * m), "5m");
        assert_eq!(window.remaining(start, stop - 10 * m), "10m");
        assert_eq!(window.remaining(start, stop - 63 * m), "1h 03m");
        assert_eq!(window.remaining(start, start + m), "9h 59m");
        assert_eq!(window.remaining(start, start + 1), "9h 59m");
        assert_eq!(window.remaining(start, start), "");
        assert_eq!(window.remaining(start, start - 20 * m), "");
        assert_eq!(window.remaining(start, stop), "");
    }

    #[test]
    fn remaining_seconds_floor() {
        let window = UptimeWindow::new(2);
        assert_eq!(window.remaining_seconds(0, 2 * MILLIS_PER_HOUR - 1500), 1);
        assert_eq!(window.remaining_seconds(0, 3 * MILLIS_PER_HOUR), 0);
    }

    #[test]
    fn running_follows_remaining() {
        let window = UptimeWindow::new(10);
        let start = 1_000_000_000_000;
        assert!(!window.is_running(start, start));
        assert!(window.is_running(start, start + MILLIS_PER_MINUTE));
        assert!(!window.is_running(start, start + 10 * MILLIS_PER_HOUR));
    }

    #[test]
    fn can_extend_below_window_minus_one_hour() {
        let window = UptimeWindow::new(10);
        let start = 1_000_000_000_000;

        // 10h and 9h30m remaining
        assert!(!window.can_extend(start, start));
        assert!(!window.can_extend(start, start + 30 * MILLIS_PER_MINUTE));
        // exactly 9h remaining
        assert!(!window.can_extend(start, start + MILLIS_PER_HOUR));
        // just under 9h remaining
        assert!(window.can_extend(start, start + MILLIS_PER_HOUR + MILLIS_PER_SECOND));
        // window closed
        assert!(window.can_extend(start, start + 11 * MILLIS_PER_HOUR));
    }

    #[test]
    fn extend_advances_one_hour() {
        let window = UptimeWindow::new(10);
        let now = 1_000_000_000_000;

        // 8 hours remain
        let last = now - 2 * MILLIS_PER_HOUR;
        assert!(window.can_extend(last, now));
        assert_eq!(window.extend(last, now), last + MILLIS_PER_HOUR);
        assert_eq!(window.remaining(window.extend(last, now), now), "9h 00m");
    }

    #[test]
    fn extend_never_moves_start_to_now_or_later() {
        let window = UptimeWindow::new(10);
        let now = 1_000_000_000_000;

        // 9h30m remain: no room to extend
        let last = now - 30 * MILLIS_PER_MINUTE;
        assert!(!window.can_extend(last, now));
        assert_eq!(window.extend(last, now), last);
    }

    #[test]
    fn extend_from_closed_window_clamps_first() {
        let window = UptimeWindow::new(10);
        let now = 1_000_000_000_000;

        // Never started: clamped to one window ago, then one hour on
        let extended = window.extend(0, now);
        assert_eq!(extended, now - 9 * MILLIS_PER_HOUR);
        assert_eq!(window.remaining(extended, now), "1h 00m");
    }

    #[test]
    fn extend_stays_within_bounds() {
        let window = UptimeWindow::new(10);
        let now = 1_573_261_444_114;
        let mut last = 0;
        for offset_minutes in (1..=24 * 60).step_by(7) {
            let candidate = now - offset_minutes * MILLIS_PER_MINUTE;
            last = window.extend(candidate, now);
            assert!(last < now);
            assert!(last >= now - 10 * MILLIS_PER_HOUR);
        }
        assert!(last > 0);
    }

    #[test]
    fn extreme_start_values_do_not_overflow() {
        let window = UptimeWindow::new(10);
        let now = 1_573_261_444_114;

        assert_eq!(window.remaining(i64::MAX, now), "");
        assert!(!window.is_running(i64::MAX, now));
        assert!(!window.can_extend(i64::MAX, now));
        assert_eq!(window.extend(i64::MAX, now), i64::MAX);

        assert_eq!(window.remaining_seconds(i64::MIN, now), 0);
        assert_eq!(window.remaining(i64::MIN, now), "");
        assert!(window.can_extend(i64::MIN, now));
        assert_eq!(window.extend(i64::MIN, now), now - 9 * MILLIS_PER_HOUR);

        assert_eq!(window.remaining_seconds(0, i64::MIN), i64::MAX / MILLIS_PER_SECOND);
        assert_eq!(window.extend(0, i64::MIN), 0);
    }

    #[test]
    fn clock_format() {
        let now = Tz::UTC
            .with_ymd_and_hms(2019, 10, 24, 21, 5, 0)
            .unwrap()
            .timestamp_millis();
        assert_eq!(format_clock(now, &Tz::UTC), "9:05PM UTC");

        let tz = chrono_tz::Australia::Melbourne;
        assert_eq!(format_clock(now, &tz), "8:05AM AEDT");
    }

    #[test]
    fn weekday_message() {
        let now = (utc(24, 12, 0) + Duration::minutes(3)).timestamp_millis();
        assert_eq!(
            weekday_start_message(Some(9), now, &Tz::UTC),
            "Auto start: Mon-Fri, 9AM UTC"
        );
        assert_eq!(
            weekday_start_message(Some(13), now, &Tz::UTC),
            "Auto start: Mon-Fri, 1PM UTC"
        );
        assert_eq!(weekday_start_message(None, now, &Tz::UTC), "Auto start disabled");
    }
}
