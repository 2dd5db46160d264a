//! Client for the Tractive pet tracker API, plus helpers that turn position
//! history into a table and a map, and a terminal viewer built on them.

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod history;
pub mod loader;
pub mod logging;
pub mod map;
pub mod models;
pub mod session;
pub mod time_utils;
pub mod ui;

pub use client::{RequestOptions, TractiveClient, BASE_URL};
pub use error::{ApiError, ExportError, MapError};
pub use export::{save_tracker_history, save_tracker_history_to, write_csv};
pub use history::{clean, clean_in};
pub use map::{plot, PetMap, PlotOptions};
pub use models::{parse_history, PetTrack, PositionRecord, TrackerHistoryTable};
pub use session::{Credentials, Session};
pub use time_utils::TimeBound;
