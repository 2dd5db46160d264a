//! In-process mock of the Tractive API for integration tests.
//!
//! Binds to a random local port and serves just enough of the real
//! endpoints to exercise every client accessor. Tokens are numbered
//! `token-1`, `token-2`, ... in issue order.

#![allow(dead_code)]

use axum::{
    extract::{Form, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const USER_ID: &str = "u1";
pub const TRACKER_ID: &str = "TRK1";
pub const PET_ID: &str = "pet1";
pub const BAD_EMAIL: &str = "bad@example.com";
/// Tracker whose reports lack `latlong` and `battery_level`.
pub const BARE_TRACKER_ID: &str = "TRK0";
/// Pet whose details lack `profile_picture_id`.
pub const NO_PICTURE_PET_ID: &str = "pet-nopic";
/// Pet without a `details` object at all.
pub const NO_DETAILS_PET_ID: &str = "pet-nodetails";

#[derive(Default)]
pub struct MockState {
    pub expires_at: u64,
    pub tokens_issued: AtomicUsize,
    pub last_auth_query: Mutex<HashMap<String, String>>,
    pub last_history_query: Mutex<HashMap<String, String>>,
}

impl MockState {
    pub fn tokens_issued(&self) -> usize {
        self.tokens_issued.load(Ordering::SeqCst)
    }
}

pub struct MockTractive {
    pub base_url: String,
    pub state: Arc<MockState>,
}

type Shared = Arc<MockState>;
type ApiResult = Result<Json<Value>, StatusCode>;

/// Starts the mock server; tokens it issues report `expires_at`.
pub async fn start(expires_at: u64) -> MockTractive {
    let state = Arc::new(MockState {
        expires_at,
        ..MockState::default()
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockTractive {
        base_url: format!("http://{addr}/4/"),
        state,
    }
}

/// An address nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/4/")
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/4/auth/token", post(issue_token))
        .route("/4/user/{user_id}/", get(user))
        .route("/4/user/{user_id}/{resource}", get(user_collection))
        .route("/4/user/{user_id}/subscription/{id}", get(subscription))
        .route("/4/tracker/{id}", get(tracker))
        .route("/4/tracker/{id}/positions", get(positions))
        .route("/4/tracker/{id}/geofences", get(geofences))
        .route("/4/tracker/{id}/command/{command}/{state}", get(command))
        .route("/4/device_pos_report/{id}", get(position_report))
        .route("/4/device_hw_report/{id}", get(hardware_report))
        .route("/4/platform/geo/address/location", get(address))
        .route("/4/geofence/{id}", get(geofence))
        .route("/4/trackable_object/{id}", get(trackable_object))
        .route("/4/broken", get(broken))
        .route("/4/echo_form", post(echo_form))
        .with_state(state)
}

fn authorized(headers: &HeaderMap) -> Result<(), StatusCode> {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let has_client = headers.contains_key("x-tractive-client");
    if bearer.starts_with("Bearer token-") && has_client {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn issue_token(State(state): State<Shared>, Query(q): Query<HashMap<String, String>>) -> ApiResult {
    *state.last_auth_query.lock().unwrap() = q.clone();
    if q.get("grant_type").map(String::as_str) != Some("tractive")
        || q.get("platform_email").map(String::as_str) == Some(BAD_EMAIL)
    {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let n = state.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
    Ok(Json(json!({
        "access_token": format!("token-{n}"),
        "user_id": USER_ID,
        "expires_at": state.expires_at,
    })))
}

async fn user(headers: HeaderMap, Path(user_id): Path<String>) -> ApiResult {
    authorized(&headers)?;
    Ok(Json(json!({ "_id": user_id, "_type": "user" })))
}

async fn user_collection(headers: HeaderMap, Path((user_id, resource)): Path<(String, String)>) -> ApiResult {
    authorized(&headers)?;
    let body = match resource.as_str() {
        "trackers" => json!([{ "_id": TRACKER_ID, "_type": "tracker" }]),
        "trackable_objects" => json!([{ "_id": PET_ID, "_type": "pet_profile" }]),
        "subscriptions" => json!([{ "_id": "sub1", "_type": "subscription", "user": user_id }]),
        "shares" => json!([]),
        _ => return Err(StatusCode::NOT_FOUND),
    };
    Ok(Json(body))
}

async fn subscription(headers: HeaderMap, Path((_user_id, id)): Path<(String, String)>) -> ApiResult {
    authorized(&headers)?;
    Ok(Json(json!({ "_id": id, "_type": "subscription" })))
}

async fn tracker(headers: HeaderMap, Path(id): Path<String>) -> ApiResult {
    authorized(&headers)?;
    if id != TRACKER_ID {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({ "_id": id, "_type": "tracker", "model_number": "TG4XL" })))
}

async fn positions(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(_id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> ApiResult {
    authorized(&headers)?;
    *state.last_history_query.lock().unwrap() = q.clone();
    if q.get("format").map(String::as_str) != Some("json_segments") {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(json!([
        [{ "time": 1000, "latlong": [1.0, 2.0], "alt": 300, "speed": 1.2, "course": 90, "sensor_used": "GPS" }],
        [{ "time": 2000, "latlong": [3.0, 4.0], "alt": 310, "speed": null, "course": null, "sensor_used": "KNOWN_WIFI" }]
    ])))
}

async fn geofences(headers: HeaderMap, Path(_id): Path<String>) -> ApiResult {
    authorized(&headers)?;
    Ok(Json(json!([{ "_id": "fence1", "_type": "geofence" }])))
}

async fn command(headers: HeaderMap, Path((id, command, state)): Path<(String, String, String)>) -> ApiResult {
    authorized(&headers)?;
    if state != "on" && state != "off" {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(json!({ "tracker": id, "command": command, "state": state })))
}

async fn position_report(headers: HeaderMap, Path(id): Path<String>) -> ApiResult {
    authorized(&headers)?;
    if id == BARE_TRACKER_ID {
        return Ok(Json(json!({ "_id": id, "time": 1000, "sensor_used": "GPS" })));
    }
    Ok(Json(json!({ "_id": id, "time": 1000, "latlong": [47.25, 13.5], "sensor_used": "GPS" })))
}

async fn hardware_report(headers: HeaderMap, Path(id): Path<String>) -> ApiResult {
    authorized(&headers)?;
    if id == BARE_TRACKER_ID {
        return Ok(Json(json!({ "_id": id, "clip_mounted_state": null })));
    }
    Ok(Json(json!({ "_id": id, "battery_level": 87, "clip_mounted_state": null })))
}

async fn address(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> ApiResult {
    authorized(&headers)?;
    let (Some(lat), Some(lon)) = (q.get("latitude"), q.get("longitude")) else {
        return Err(StatusCode::BAD_REQUEST);
    };
    Ok(Json(json!({ "address": { "street": "Hauptstrasse", "query": format!("{lat},{lon}") } })))
}

async fn geofence(headers: HeaderMap, Path(id): Path<String>) -> ApiResult {
    authorized(&headers)?;
    Ok(Json(json!({ "_id": id, "_type": "geofence", "name": "Home" })))
}

async fn trackable_object(headers: HeaderMap, Path(id): Path<String>) -> ApiResult {
    authorized(&headers)?;
    match id.as_str() {
        NO_PICTURE_PET_ID => {
            return Ok(Json(json!({ "_id": id, "device_id": TRACKER_ID, "details": { "name": "Tom" } })));
        }
        NO_DETAILS_PET_ID => return Ok(Json(json!({ "_id": id, "device_id": TRACKER_ID }))),
        _ => {}
    }
    Ok(Json(json!({
        "_id": id,
        "_type": "pet",
        "device_id": TRACKER_ID,
        "details": { "name": "Rex", "profile_picture_id": "pic9" }
    })))
}

async fn broken() -> &'static str {
    "this is not json"
}

/// Returns the decoded form body and the content type it arrived with.
async fn echo_form(headers: HeaderMap, Form(body): Form<HashMap<String, String>>) -> Json<Value> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({ "content_type": content_type, "form": body }))
}
