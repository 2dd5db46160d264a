use crate::error::ApiError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One reported position as returned by the positions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionRecord {
    /// Epoch seconds.
    pub time: i64,
    /// `[latitude, longitude]`
    pub latlong: [f64; 2],
    #[serde(default)]
    pub alt: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub course: Option<f64>,
    #[serde(default)]
    pub sensor_used: Option<String>,
}

/// Segments of positions, in the order the API returned them.
pub type TrackerHistory = Vec<Vec<PositionRecord>>;

/// Decodes the `json_segments` body of a history request.
pub fn parse_history(value: &serde_json::Value) -> Result<TrackerHistory, ApiError> {
    TrackerHistory::deserialize(value).map_err(|e| ApiError::Shape(format!("history: {e}")))
}

/// One row of a [`TrackerHistoryTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub tracker: String,
    pub time: i64,
    /// Wall-clock time of `time` in the zone used for cleaning. `None` if
    /// `time` is outside chrono's range.
    pub datetime: Option<NaiveDateTime>,
    pub alt: Option<f64>,
    pub speed: Option<f64>,
    pub course: Option<f64>,
    pub sensor_used: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Column names of [`HistoryRow`], in output order.
pub const COLUMNS: [&str; 9] = [
    "tracker",
    "time",
    "datetime",
    "alt",
    "speed",
    "course",
    "sensor_used",
    "latitude",
    "longitude",
];

/// Flattened, typed position history of one tracker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerHistoryTable {
    pub rows: Vec<HistoryRow>,
}

impl TrackerHistoryTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latitudes(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.latitude)
    }

    pub fn longitudes(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.longitude)
    }

    /// `(latitude, longitude)` pairs in row order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.rows.iter().map(|r| (r.latitude, r.longitude))
    }

    /// Mean latitude and longitude, or `None` for an empty table.
    pub fn mean_position(&self) -> Option<(f64, f64)> {
        if self.rows.is_empty() {
            return None;
        }
        let n = self.rows.len() as f64;
        Some((self.latitudes().sum::<f64>() / n, self.longitudes().sum::<f64>() / n))
    }
}

/// A pet's cleaned history plus what the map needs to label it.
#[derive(Debug, Clone)]
pub struct PetTrack {
    pub label: String,
    pub icon_url: Option<String>,
    pub table: TrackerHistoryTable,
}

impl PetTrack {
    pub fn new(label: impl Into<String>, icon_url: Option<String>, table: TrackerHistoryTable) -> Self {
        Self {
            label: label.into(),
            icon_url,
            table,
        }
    }
}
