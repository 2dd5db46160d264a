//! Reshapes segmented position history into a flat table.

use crate::models::{HistoryRow, PositionRecord, TrackerHistoryTable};
use chrono::{DateTime, Local, TimeZone};

/// Flattens `history` for `tracker_id`, deriving datetimes in the local zone.
pub fn clean(tracker_id: &str, history: &[Vec<PositionRecord>]) -> TrackerHistoryTable {
    clean_in(tracker_id, history, &Local)
}

/// Same as [`clean`] but with an explicit time zone.
///
/// Segments are concatenated in order. Nothing is sorted, deduplicated or
/// dropped, so the table has exactly one row per input record.
pub fn clean_in<Tz: TimeZone>(
    tracker_id: &str,
    history: &[Vec<PositionRecord>],
    tz: &Tz,
) -> TrackerHistoryTable {
    let rows = history
        .iter()
        .flatten()
        .map(|record| {
            let [latitude, longitude] = record.latlong;
            HistoryRow {
                tracker: tracker_id.to_string(),
                time: record.time,
                datetime: DateTime::from_timestamp(record.time, 0)
                    .map(|utc| utc.with_timezone(tz).naive_local()),
                alt: record.alt,
                speed: record.speed,
                course: record.course,
                sensor_used: record.sensor_used.clone(),
                latitude,
                longitude,
            }
        })
        .collect();

    TrackerHistoryTable { rows }
}
