use crate::client::BASE_URL;
use crate::map::DEFAULT_ZOOM;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub api: ApiConfig,
    pub history: HistoryConfig,
    pub map: MapConfig,
    pub ui: UiConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryConfig {
    pub days: u32, // How far back the viewer loads positions
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub zoom_start: u8,
    pub custom_icon: bool, // Use pet profile pictures as markers
    pub html_output: String,
    pub csv_output: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig {
                base_url: BASE_URL.to_string(),
                timeout_seconds: 10,
            },
            history: HistoryConfig { days: 1 },
            map: MapConfig {
                zoom_start: DEFAULT_ZOOM,
                custom_icon: false,
                html_output: "tracker_map.html".to_string(),
                csv_output: "tracker_history.csv".to_string(),
            },
            ui: UiConfig { tick_rate_ms: 150 },
        }
    }
}

impl Config {
    /// Loads config.toml from the working directory.
    /// If it doesn't exist, creates a default one.
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if let Ok(content) = fs::read_to_string(path) {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => warn!("Failed to parse {}: {}. Using defaults.", path.display(), e),
            }
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(path, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", path.display());
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path);
        assert_eq!(config, Config::default());
        assert!(path.exists());
        // And the written file loads back the same.
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn user_values_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut custom = Config::default();
        custom.history.days = 7;
        custom.map.custom_icon = true;
        fs::write(&path, toml::to_string_pretty(&custom).unwrap()).unwrap();

        assert_eq!(Config::load_from(&path), custom);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is = = not toml").unwrap();

        assert_eq!(Config::load_from(&path), Config::default());
    }
}
