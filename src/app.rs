use crate::config::Config;
use crate::export::{save_tracker_history, write_csv};
use crate::loader::PetHistory;
use crate::map::{plot, PetMap, PlotOptions};
use crate::models::PetTrack;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;
use tracing::{error, info};

pub struct App {
    pub config: Config,
    pub pets: Vec<PetHistory>,
    pub map: Option<PetMap>,
    pub selected_index: usize,
    pub tick_count: usize,
    pub should_quit: bool,

    // Loader state tracking
    pub is_loading: bool,
    pub reload_requested: bool,
    pub last_update: Option<Instant>,
    pub status: String,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            pets: Vec::new(),
            map: None,
            selected_index: 0,
            tick_count: 0,
            should_quit: false,
            is_loading: true,
            reload_requested: false,
            last_update: None,
            status: "Signing in...".to_string(),
        }
    }

    pub fn on_tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
    }

    pub fn plot_options(&self) -> PlotOptions {
        PlotOptions {
            custom_icon: self.config.map.custom_icon,
            zoom_start: self.config.map.zoom_start,
            ..PlotOptions::default()
        }
    }

    pub fn on_history_loaded(&mut self, pets: Vec<PetHistory>, timestamp: Instant) {
        self.is_loading = false;
        self.last_update = Some(timestamp);
        self.selected_index = 0;

        let tracks: Vec<PetTrack> = pets.iter().map(|p| p.track.clone()).collect();
        match plot(&tracks, &self.plot_options()) {
            Ok(map) => {
                self.status = format!("{} pets, {} positions", pets.len(), map.markers.len());
                self.map = Some(map);
            }
            Err(e) => {
                self.status = format!("Nothing to plot: {}", e);
                self.map = None;
            }
        }
        self.pets = pets;
    }

    pub fn on_load_failed(&mut self, message: String) {
        self.is_loading = false;
        self.status = format!("Load failed: {}", message);
    }

    pub fn selected(&self) -> Option<&PetHistory> {
        self.pets.get(self.selected_index)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        // Only quitting is allowed while the loader runs
        if self.is_loading {
            if let KeyCode::Char('q') = key.code {
                self.should_quit = true;
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => {
                if !self.pets.is_empty() {
                    self.selected_index = (self.selected_index + 1) % self.pets.len();
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if !self.pets.is_empty() {
                    self.selected_index = self
                        .selected_index
                        .checked_sub(1)
                        .unwrap_or(self.pets.len() - 1);
                }
            }
            KeyCode::Char('r') => {
                self.is_loading = true;
                self.reload_requested = true;
                self.status = "Reloading...".to_string();
            }
            KeyCode::Char('m') => self.export_map(),
            KeyCode::Char('c') => self.export_csv(),
            KeyCode::Char('s') => self.save_raw(),
            _ => {}
        }
    }

    fn export_map(&mut self) {
        let Some(map) = &self.map else {
            self.status = "No map to export".to_string();
            return;
        };
        let path = self.config.map.html_output.clone();
        self.status = match map.save_html(&path) {
            Ok(()) => format!("Map written to {}", path),
            Err(e) => {
                error!("Map export failed: {}", e);
                format!("Map export failed: {}", e)
            }
        };
    }

    fn export_csv(&mut self) {
        let Some(pet) = self.selected() else {
            return;
        };
        let path = self.config.map.csv_output.clone();
        self.status = match write_csv(&pet.track.table, &path) {
            Ok(()) => format!("{} rows of {} written to {}", pet.track.table.len(), pet.track.label, path),
            Err(e) => {
                error!("CSV export failed: {}", e);
                format!("CSV export failed: {}", e)
            }
        };
    }

    fn save_raw(&mut self) {
        let Some(pet) = self.selected() else {
            return;
        };
        self.status = match save_tracker_history(&pet.raw) {
            Ok(()) => {
                info!(tracker = %pet.tracker_id, "raw history saved");
                format!("Raw history of {} saved", pet.track.label)
            }
            Err(e) => {
                error!("Saving raw history failed: {}", e);
                format!("Saving raw history failed: {}", e)
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoryRow, TrackerHistoryTable};

    fn pet(name: &str, points: &[(f64, f64)]) -> PetHistory {
        let rows = points
            .iter()
            .map(|&(latitude, longitude)| HistoryRow {
                tracker: format!("T-{name}"),
                time: 0,
                datetime: None,
                alt: None,
                speed: None,
                course: None,
                sensor_used: None,
                latitude,
                longitude,
            })
            .collect();
        PetHistory {
            pet_id: name.to_string(),
            tracker_id: format!("T-{name}"),
            track: PetTrack::new(name, None, TrackerHistoryTable { rows }),
            raw: serde_json::Value::Null,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn loading_blocks_everything_but_quit() {
        let mut app = App::new(Config::default());
        app.handle_key(press(KeyCode::Char('r')));
        assert!(!app.reload_requested);
        app.handle_key(press(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn loaded_history_builds_map_and_selection_wraps() {
        let mut app = App::new(Config::default());
        app.on_history_loaded(
            vec![pet("rex", &[(1.0, 1.0), (2.0, 2.0)]), pet("tom", &[(3.0, 3.0)])],
            Instant::now(),
        );
        assert!(!app.is_loading);
        assert_eq!(app.map.as_ref().map(|m| m.markers.len()), Some(3));

        app.handle_key(press(KeyCode::Up));
        assert_eq!(app.selected_index, 1);
        app.handle_key(press(KeyCode::Char('j')));
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn idle_first_pet_still_shows_the_map() {
        let mut app = App::new(Config::default());
        app.on_history_loaded(
            vec![pet("idle", &[]), pet("rex", &[(1.0, 1.0), (3.0, 3.0)])],
            Instant::now(),
        );
        let map = app.map.as_ref().unwrap();
        assert_eq!(map.markers.len(), 2);
        assert_eq!(map.center, (2.0, 2.0));
        assert_eq!(app.pets.len(), 2);
    }

    #[test]
    fn empty_account_reports_nothing_to_plot() {
        let mut app = App::new(Config::default());
        app.on_history_loaded(Vec::new(), Instant::now());
        assert!(app.map.is_none());
        assert!(app.status.starts_with("Nothing to plot"));
    }

    #[test]
    fn reload_key_flags_loader() {
        let mut app = App::new(Config::default());
        app.on_load_failed("boom".into());
        app.handle_key(press(KeyCode::Char('r')));
        assert!(app.reload_requested);
        assert!(app.is_loading);
    }
}
