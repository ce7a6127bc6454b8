//! Time window that bounds expansion and the existing-event query.

use chrono::{DateTime, Duration, Months, NaiveDate, TimeZone, Utc};

use crate::error::{FeedSyncError, FeedSyncResult};

/// Calendar months kept behind `now` by default.
pub const DEFAULT_PAST_MONTHS: u32 = 12;
/// Calendar months kept ahead of `now` by default.
pub const DEFAULT_FUTURE_MONTHS: u32 = 24;

/// Half-open range `[from, to)`.
///
/// An event is inside the window when it overlaps it: `start < to && end > from`.
/// Zero-length events are inside when `from <= start < to`. CalDAV's `time-range`
/// filter uses the same rule, so the expander and the remote query agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Default for SyncWindow {
    /// One calendar year back, two calendar years ahead of now.
    fn default() -> Self {
        SyncWindow::around(Utc::now())
    }
}

impl SyncWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> FeedSyncResult<Self> {
        if from >= to {
            return Err(FeedSyncError::Config(format!(
                "Sync window start {} must be before its end {}",
                from.to_rfc3339(),
                to.to_rfc3339()
            )));
        }
        Ok(SyncWindow { from, to })
    }

    /// The default window anchored at `now`.
    pub fn around(now: DateTime<Utc>) -> Self {
        let from = now
            .checked_sub_months(Months::new(DEFAULT_PAST_MONTHS))
            .unwrap_or(now - Duration::days(365));
        let to = now
            .checked_add_months(Months::new(DEFAULT_FUTURE_MONTHS))
            .unwrap_or(now + Duration::days(730));
        SyncWindow { from, to }
    }

    /// Window anchored at `now` with optional day-count overrides for either side.
    pub fn with_days(
        now: DateTime<Utc>,
        past_days: Option<i64>,
        future_days: Option<i64>,
    ) -> FeedSyncResult<Self> {
        let default = SyncWindow::around(now);
        let from = match past_days {
            Some(days) => Duration::try_days(days)
                .and_then(|span| now.checked_sub_signed(span))
                .ok_or_else(|| out_of_range("past_days", days))?,
            None => default.from,
        };
        let to = match future_days {
            Some(days) => Duration::try_days(days)
                .and_then(|span| now.checked_add_signed(span))
                .ok_or_else(|| out_of_range("future_days", days))?,
            None => default.to,
        };
        SyncWindow::new(from, to)
    }

    /// Override either bound from CLI arguments.
    /// - `from`: YYYY-MM-DD, start of that day (UTC)
    /// - `to`: YYYY-MM-DD, the whole day is included
    pub fn with_args(self, from: Option<&str>, to: Option<&str>) -> FeedSyncResult<Self> {
        let from = match from {
            Some(s) => parse_date(s)?,
            None => self.from,
        };
        let to = match to {
            Some(s) => parse_date(s)? + Duration::days(1),
            None => self.to,
        };
        SyncWindow::new(from, to)
    }

    /// Whether an event spanning `[start, end)` overlaps the window.
    pub fn contains<Tz: TimeZone>(&self, start: &DateTime<Tz>, end: &DateTime<Tz>) -> bool {
        let start = start.with_timezone(&Utc);
        let end = end.with_timezone(&Utc);

        if end <= start {
            return start >= self.from && start < self.to;
        }
        start < self.to && end > self.from
    }

    /// Bounds in the `YYYYMMDDTHHMMSSZ` form used by CalDAV time-range filters.
    pub fn to_caldav_range(&self) -> (String, String) {
        (
            self.from.format("%Y%m%dT%H%M%SZ").to_string(),
            self.to.format("%Y%m%dT%H%M%SZ").to_string(),
        )
    }
}

fn out_of_range(key: &str, days: i64) -> FeedSyncError {
    FeedSyncError::Config(format!("{} = {} is out of range", key, days))
}

/// Parse YYYY-MM-DD as start of day in UTC
fn parse_date(s: &str) -> FeedSyncResult<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        FeedSyncError::Config(format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
    })?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn january() -> SyncWindow {
        SyncWindow::new(utc(2024, 1, 1, 0, 0), utc(2024, 2, 1, 0, 0)).unwrap()
    }

    #[test]
    fn test_default_window_is_one_year_back_two_ahead() {
        let now = utc(2024, 6, 15, 12, 0);
        let window = SyncWindow::around(now);
        assert_eq!(window.from, utc(2023, 6, 15, 12, 0));
        assert_eq!(window.to, utc(2026, 6, 15, 12, 0));
    }

    #[test]
    fn test_window_is_half_open() {
        let window = january();
        assert!(window.contains(&utc(2024, 1, 1, 0, 0), &utc(2024, 1, 1, 1, 0)));
        assert!(!window.contains(&utc(2024, 2, 1, 0, 0), &utc(2024, 2, 1, 1, 0)));
        // Ends exactly at `from`: no overlap
        assert!(!window.contains(&utc(2023, 12, 31, 23, 0), &utc(2024, 1, 1, 0, 0)));
        // Straddles `from`: overlaps
        assert!(window.contains(&utc(2023, 12, 31, 23, 0), &utc(2024, 1, 1, 0, 30)));
    }

    #[test]
    fn test_zero_length_event_at_bounds() {
        let window = january();
        let at_from = utc(2024, 1, 1, 0, 0);
        let at_to = utc(2024, 2, 1, 0, 0);
        assert!(window.contains(&at_from, &at_from));
        assert!(!window.contains(&at_to, &at_to));
    }

    #[test]
    fn test_contains_normalizes_timezones() {
        let window = january();
        let ny = chrono_tz::America::New_York;
        // 2024-01-31 20:00 in New York is 2024-02-01 01:00 UTC
        let start = ny.with_ymd_and_hms(2024, 1, 31, 20, 0, 0).unwrap();
        let end = start + Duration::hours(1);
        assert!(!window.contains(&start, &end));
    }

    #[test]
    fn test_rejects_inverted_window() {
        let result = SyncWindow::new(utc(2024, 2, 1, 0, 0), utc(2024, 1, 1, 0, 0));
        assert!(matches!(result, Err(FeedSyncError::Config(_))));
    }

    #[test]
    fn test_with_args_includes_whole_to_day() {
        let window = january()
            .with_args(Some("2024-01-10"), Some("2024-01-20"))
            .unwrap();
        assert_eq!(window.from, utc(2024, 1, 10, 0, 0));
        assert_eq!(window.to, utc(2024, 1, 21, 0, 0));
    }

    #[test]
    fn test_with_args_rejects_bad_dates() {
        assert!(january().with_args(Some("01/10/2024"), None).is_err());
    }

    #[test]
    fn test_with_days_overrides_one_side() {
        let now = utc(2024, 6, 15, 0, 0);
        let window = SyncWindow::with_days(now, Some(30), None).unwrap();
        assert_eq!(window.from, utc(2024, 5, 16, 0, 0));
        assert_eq!(window.to, utc(2026, 6, 15, 0, 0));
    }

    #[test]
    fn test_with_days_rejects_out_of_range_counts() {
        let now = utc(2024, 6, 15, 0, 0);
        for (past, future) in [(Some(1_000_000_000_000), None), (None, Some(i64::MAX))] {
            let result = SyncWindow::with_days(now, past, future);
            assert!(matches!(result, Err(FeedSyncError::Config(_))));
        }
        // In range for a TimeDelta but past chrono's last representable date
        assert!(SyncWindow::with_days(now, None, Some(200_000_000)).is_err());
    }

    #[test]
    fn test_caldav_range_format() {
        let (from, to) = january().to_caldav_range();
        assert_eq!(from, "20240101T000000Z");
        assert_eq!(to, "20240201T000000Z");
    }
}
