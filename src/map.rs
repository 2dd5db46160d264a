//! Plots pet tracks onto a Leaflet map.
//!
//! [`plot`] turns cleaned tracks into a [`PetMap`]: one colored marker per
//! position, centered on the first pet that has positions and fitted to
//! every marker. The map
//! can be written out as a standalone HTML page or drawn by the TUI.

use crate::error::{ExportError, MapError};
use crate::models::PetTrack;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Marker colors understood by Leaflet.awesome-markers, assigned in order.
pub const DEFAULT_PALETTE: [&str; 19] = [
    "red",
    "blue",
    "green",
    "purple",
    "orange",
    "darkred",
    "lightred",
    "beige",
    "darkblue",
    "darkgreen",
    "cadetblue",
    "darkpurple",
    "white",
    "pink",
    "lightblue",
    "lightgreen",
    "gray",
    "black",
    "lightgray",
];

pub const DEFAULT_ZOOM: u8 = 5;

#[derive(Debug, Clone)]
pub struct PlotOptions {
    /// Use each pet's icon image instead of a colored pin.
    pub custom_icon: bool,
    pub zoom_start: u8,
    pub palette: Vec<String>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            custom_icon: false,
            zoom_start: DEFAULT_ZOOM,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Lat/lon box, `[south, west]` to `[north, east]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Smallest box holding every point, `None` if there are none.
    pub fn fit(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc, (lat, lon)| {
            Some(match acc {
                None => Bounds {
                    south: lat,
                    west: lon,
                    north: lat,
                    east: lon,
                },
                Some(b) => Bounds {
                    south: b.south.min(lat),
                    west: b.west.min(lon),
                    north: b.north.max(lat),
                    east: b.east.max(lon),
                },
            })
        })
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.south..=self.north).contains(&lat) && (self.west..=self.east).contains(&lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSeries {
    pub label: String,
    pub color: String,
    pub icon_url: Option<String>,
    pub points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    /// Index into [`PetMap::series`].
    pub series: usize,
    pub latitude: f64,
    pub longitude: f64,
    pub popup: String,
    pub color: String,
    /// Set only when plotting with custom icons.
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PetMap {
    /// Initial view center, the mean position of the first pet with any.
    pub center: (f64, f64),
    pub zoom: u8,
    pub series: Vec<MapSeries>,
    pub markers: Vec<MapMarker>,
    /// Viewport fitted around every marker.
    pub bounds: Bounds,
}

/// Places every point of every track on a map.
///
/// Pets get palette colors in order. Fails rather than reusing a color when
/// there are more tracks than palette entries.
pub fn plot(tracks: &[PetTrack], options: &PlotOptions) -> Result<PetMap, MapError> {
    let first = tracks.first().ok_or(MapError::Empty)?;
    if tracks.len() > options.palette.len() {
        return Err(MapError::TooManySeries {
            count: tracks.len(),
            palette: options.palette.len(),
        });
    }
    // Pets with nothing in the window still get a series, just no markers.
    let center = tracks
        .iter()
        .find_map(|t| t.table.mean_position())
        .ok_or_else(|| MapError::EmptySeries(first.label.clone()))?;

    let mut series = Vec::with_capacity(tracks.len());
    let mut markers = Vec::new();
    for (i, (track, color)) in tracks.iter().zip(&options.palette).enumerate() {
        let icon_url = if options.custom_icon {
            track.icon_url.clone()
        } else {
            None
        };
        for (lat, lon) in track.table.points() {
            markers.push(MapMarker {
                series: i,
                latitude: lat,
                longitude: lon,
                popup: format!("({lat:?}, {lon:?})"),
                color: color.clone(),
                icon_url: icon_url.clone(),
            });
        }
        series.push(MapSeries {
            label: track.label.clone(),
            color: color.clone(),
            icon_url,
            points: track.table.len(),
        });
    }

    // Some track had a mean position, so there is at least one marker.
    let bounds = Bounds::fit(markers.iter().map(|m| (m.latitude, m.longitude)))
        .ok_or_else(|| MapError::EmptySeries(first.label.clone()))?;

    Ok(PetMap {
        center,
        zoom: options.zoom_start,
        series,
        markers,
        bounds,
    })
}

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
<title>Pet tracks</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css" />
<link rel="stylesheet" href="https://netdna.bootstrapcdn.com/bootstrap/3.0.0/css/bootstrap-glyphicons.css" />
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js"></script>
<style>html, body, #map { width: 100%; height: 100%; margin: 0; padding: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
const data = __DATA__;
const map = L.map("map").setView(data.center, data.zoom);
L.tileLayer("https://tile.openstreetmap.org/{z}/{x}/{y}.png", {
  maxZoom: 19,
  attribution: "&copy; OpenStreetMap contributors"
}).addTo(map);
for (const m of data.markers) {
  const icon = m.icon_url
    ? L.icon({ iconUrl: m.icon_url, iconSize: [32, 32] })
    : L.AwesomeMarkers.icon({ icon: "info-sign", prefix: "glyphicon", markerColor: m.color });
  L.marker([m.latitude, m.longitude], { icon: icon }).bindPopup(m.popup).addTo(map);
}
map.fitBounds([[data.bounds.south, data.bounds.west], [data.bounds.north, data.bounds.east]]);
</script>
</body>
</html>
"#;

impl PetMap {
    /// Standalone Leaflet page showing every marker.
    pub fn to_html(&self) -> Result<String, ExportError> {
        // `</` inside the inline script would end it early.
        let data = serde_json::to_string(self)?.replace("</", "<\\/");
        Ok(HTML_TEMPLATE.replace("__DATA__", &data))
    }

    pub fn save_html(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_html()?)?;
        info!(path = %path.display(), markers = self.markers.len(), "map written");
        Ok(())
    }
}
