//! Time utilities for steam-playtime
//!
//! All playtime accounting uses local wall-clock time. Clock changes while a
//! game is running are not corrected for.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `STEAM_PLAYTIME_MOCK_TIME` environment variable can be
//! set to override the system time. This is useful for checking how sessions
//! around midnight are bucketed.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-31 23:59:30`)
//!
//! Example:
//! ```bash
//! STEAM_PLAYTIME_MOCK_TIME="2025-12-31 23:59:30" cargo run -p playtimed
//! ```

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "STEAM_PLAYTIME_MOCK_TIME";

/// Timestamp format stored in `last_open` / `last_close`
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date format used for the per-day buckets of the playtime document
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Offset between mock time and real time, computed once.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match parse_datetime(&mock_time_str) {
                    Some(mock_dt) => {
                        let offset = mock_dt.signed_duration_since(chrono::Local::now());
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
                            expected_format = DATETIME_FORMAT,
                            "Invalid mock time"
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

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Format a DateTime as a console log prefix.
pub fn format_clock_time(dt: &DateTime<Local>) -> String {
    dt.format("%H:%M:%S").to_string()
}

/// Format a DateTime with full date and time, as stored in the playtime document.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Format the calendar date used as a playtime document bucket.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` bucket key.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp as naive local time.
pub fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).ok()
}

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp into the local timezone.
///
/// Ambiguous local times (DST fold) resolve to the earlier instant.
pub fn parse_datetime(s: &str) -> Option<DateTime<Local>> {
    let naive = parse_naive_datetime(s)?;
    Local.from_local_datetime(&naive).earliest()
}

/// True when both dates fall in the same ISO year and week.
pub fn same_iso_week(a: NaiveDate, b: NaiveDate) -> bool {
    a.iso_week() == b.iso_week()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock_time() {
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(format_clock_time(&dt), "14:30:45");
    }

    #[test]
    fn test_format_datetime_full() {
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(format_datetime_full(&dt), "2025-12-25 14:30:45");
    }

    #[test]
    fn test_datetime_parse_matches_format() {
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        let parsed = parse_datetime(&format_datetime_full(&dt)).unwrap();
        assert_eq!(parsed, dt);
        assert!(parse_datetime("2025-12-25T14:30:45").is_none());
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("2024-01-01").unwrap();
        assert_eq!(format_date(date), "2024-01-01");
        assert!(parse_date("yesterday").is_none());
    }

    #[test]
    fn test_same_iso_week_respects_year() {
        let mon = NaiveDate::from_ymd_opt(2025, 12, 22).unwrap();
        let sun = NaiveDate::from_ymd_opt(2025, 12, 28).unwrap();
        let next_mon = NaiveDate::from_ymd_opt(2025, 12, 29).unwrap();
        let year_earlier = NaiveDate::from_ymd_opt(2024, 12, 23).unwrap();

        assert!(same_iso_week(mon, sun));
        assert!(!same_iso_week(sun, next_mon));
        assert!(!same_iso_week(mon, year_earlier));
    }
}
