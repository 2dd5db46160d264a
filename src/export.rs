//! Writes history to disk: the raw API value as JSON, or a cleaned table as CSV.

use crate::error::ExportError;
use crate::models::{TrackerHistoryTable, COLUMNS};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// File name used by [`save_tracker_history`].
pub const HISTORY_FILE: &str = "tracker_history.json";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Dumps the unprocessed history value to `tracker_history.json` in the
/// working directory, replacing any previous dump.
pub fn save_tracker_history(history: &serde_json::Value) -> Result<(), ExportError> {
    save_tracker_history_to(HISTORY_FILE, history)
}

pub fn save_tracker_history_to(
    path: impl AsRef<Path>,
    history: &serde_json::Value,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, history)?;
    writer.flush()?;
    info!(path = %path.display(), "raw history saved");
    Ok(())
}

/// Writes `table` as CSV with a header row of [`COLUMNS`]. Missing values
/// are empty cells.
pub fn write_csv(table: &TrackerHistoryTable, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let path = path.as_ref();
    let mut wtr = csv::Writer::from_path(path)?;
    write_rows(table, &mut wtr)?;
    wtr.flush()?;
    info!(path = %path.display(), rows = table.len(), "history table exported");
    Ok(())
}

fn write_rows<W: Write>(table: &TrackerHistoryTable, wtr: &mut csv::Writer<W>) -> Result<(), ExportError> {
    fn opt<T: ToString>(v: &Option<T>) -> String {
        v.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    wtr.write_record(COLUMNS)?;
    for row in &table.rows {
        wtr.write_record([
            row.tracker.clone(),
            row.time.to_string(),
            row.datetime
                .map(|dt| dt.format(DATETIME_FORMAT).to_string())
                .unwrap_or_default(),
            opt(&row.alt),
            opt(&row.speed),
            opt(&row.course),
            opt(&row.sensor_used),
            row.latitude.to_string(),
            row.longitude.to_string(),
        ])?;
    }
    Ok(())
}
