//! Wall-clock access and loose timestamp parsing
//!
//! Overdue detection and month bucketing depend on "now", so every
//! component receives time through the [`Clock`] trait and tests freeze it
//! with [`FixedClock`].
//!
//! Stored timestamps come from HTML inputs and older exports, so several
//! shapes are accepted: RFC 3339, `YYYY-MM-DDTHH:MM[:SS]`, `YYYY-MM-DD`
//! and `DD-MM-YYYY`. Values carrying an offset are converted to local time.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};

pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;

    /// Milliseconds since the Unix epoch, used for record ids
    fn now_millis(&self) -> i64 {
        self.now().and_utc().timestamp_millis()
    }
}

/// The real clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Freeze at midnight of the given calendar date
    pub fn at_date(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(|date| Self(date.and_time(NaiveTime::MIN)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Format a timestamp the way records store it
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Parse any accepted timestamp shape; `None` for blank or unknown input.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    parse_date(raw).map(|d| d.and_time(NaiveTime::MIN))
}

/// Parse a calendar date in either `YYYY-MM-DD` or `DD-MM-YYYY` form.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d-%m-%Y"))
        .ok()
}

/// Sort key for date-like columns.
///
/// `DD-MM-YYYY` and `YYYY-MM-DD` (optionally followed by a time) both map
/// to `YYYYMMDD`; anything else falls back to its lower-cased text.
pub fn date_sort_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let head = trimmed.get(..10).unwrap_or(trimmed);

    match parse_date(head) {
        Some(date) => date.format("%Y%m%d").to_string(),
        None => trimmed.to_lowercase(),
    }
}

/// Days between two timestamps rounded to the nearest whole day, ignoring
/// direction
pub fn days_between(a: NaiveDateTime, b: NaiveDateTime) -> i64 {
    let seconds = (b - a).num_seconds().abs();
    (seconds + 43_200) / 86_400
}
