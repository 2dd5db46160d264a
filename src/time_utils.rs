//! Time range bounds accepted by the position history endpoint.

use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// One end of a history query window.
///
/// The endpoint wants whole POSIX seconds as a string. Strings are assumed to
/// already be in that format and are sent verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeBound {
    Formatted(String),
    Instant(DateTime<Utc>),
    /// A calendar day, taken as local midnight.
    Date(NaiveDate),
    /// A wall-clock time in the local zone.
    Naive(NaiveDateTime),
}

impl TimeBound {
    pub fn to_api_string(&self) -> String {
        match self {
            TimeBound::Formatted(s) => s.clone(),
            TimeBound::Instant(dt) => whole_seconds(dt).to_string(),
            TimeBound::Date(date) => {
                let midnight = date.and_time(chrono::NaiveTime::default());
                local_seconds(&midnight).to_string()
            }
            TimeBound::Naive(naive) => local_seconds(naive).to_string(),
        }
    }
}

/// Rounds to the nearest second, half up.
fn whole_seconds<Tz: TimeZone>(dt: &DateTime<Tz>) -> i64 {
    let secs = dt.timestamp();
    if dt.timestamp_subsec_nanos() >= 500_000_000 {
        secs + 1
    } else {
        secs
    }
}

fn local_seconds(naive: &NaiveDateTime) -> i64 {
    resolved_seconds(Local.from_local_datetime(naive), naive)
}

/// Ambiguous wall times take the earlier instant. Gaps (DST spring-forward)
/// fall back to reading `naive` as UTC.
fn resolved_seconds<Tz: TimeZone>(resolved: LocalResult<DateTime<Tz>>, naive: &NaiveDateTime) -> i64 {
    match resolved.earliest() {
        Some(dt) => whole_seconds(&dt),
        None => whole_seconds(&naive.and_utc()),
    }
}

impl From<&str> for TimeBound {
    fn from(s: &str) -> Self {
        TimeBound::Formatted(s.to_string())
    }
}

impl From<String> for TimeBound {
    fn from(s: String) -> Self {
        TimeBound::Formatted(s)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for TimeBound {
    fn from(dt: DateTime<Tz>) -> Self {
        TimeBound::Instant(dt.with_timezone(&Utc))
    }
}

impl From<NaiveDate> for TimeBound {
    fn from(date: NaiveDate) -> Self {
        TimeBound::Date(date)
    }
}

impl From<NaiveDateTime> for TimeBound {
    fn from(naive: NaiveDateTime) -> Self {
        TimeBound::Naive(naive)
    }
}
