//! Background loading of every pet's recent history for the viewer.

use crate::client::TractiveClient;
use crate::error::ApiError;
use crate::history::clean;
use crate::models::{parse_history, PetTrack};
use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{info, warn};

/// A pet's cleaned track together with the raw API value it came from.
#[derive(Debug, Clone)]
pub struct PetHistory {
    pub pet_id: String,
    pub tracker_id: String,
    pub track: PetTrack,
    pub raw: Value,
}

/// Logs in if needed, then fetches and cleans the last `days` of positions
/// for each pet on the account.
///
/// Pets without a tracker, or whose history cannot be fetched, are skipped
/// with a warning. Failing to list the pets is an error.
pub async fn load_pet_histories(client: &TractiveClient, days: u32) -> Result<Vec<PetHistory>, ApiError> {
    if !client.authenticated() {
        client.authenticate().await?;
    }

    let pets = client.get_pets().await?;
    let ids = pet_ids(&pets)?;
    let end = Utc::now();
    let start = end - Duration::days(i64::from(days));

    let mut loaded = Vec::with_capacity(ids.len());
    for pet_id in ids {
        match load_one(client, &pet_id, start, end).await {
            Ok(Some(history)) => loaded.push(history),
            Ok(None) => warn!(pet_id, "pet has no tracker, skipping"),
            Err(e) => warn!(pet_id, error = %e, "could not load pet history, skipping"),
        }
    }
    info!(pets = loaded.len(), days, "pet histories loaded");
    Ok(loaded)
}

async fn load_one(
    client: &TractiveClient,
    pet_id: &str,
    start: chrono::DateTime<Utc>,
    end: chrono::DateTime<Utc>,
) -> Result<Option<PetHistory>, ApiError> {
    let pet = client.get_pet(pet_id).await?;
    let Some(tracker_id) = pet.get("device_id").and_then(Value::as_str) else {
        return Ok(None);
    };
    let label = pet
        .pointer("/details/name")
        .and_then(Value::as_str)
        .unwrap_or(pet_id)
        .to_string();
    let icon_url = pet
        .pointer("/details/profile_picture_link")
        .and_then(Value::as_str)
        .map(str::to_string);

    let raw = client.get_tracker_history(tracker_id, start, end).await?;
    let table = clean(tracker_id, &parse_history(&raw)?);

    Ok(Some(PetHistory {
        pet_id: pet_id.to_string(),
        tracker_id: tracker_id.to_string(),
        track: PetTrack::new(label, icon_url, table),
        raw,
    }))
}

/// Ids from the `trackable_objects` listing (`[{"_id": ..}, ..]`).
fn pet_ids(pets: &Value) -> Result<Vec<String>, ApiError> {
    let list = pets
        .as_array()
        .ok_or_else(|| ApiError::Shape("trackable_objects is not a list".into()))?;
    list.iter()
        .map(|p| {
            p.get("_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ApiError::missing("_id"))
        })
        .collect()
}
