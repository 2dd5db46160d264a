//! Tractive API client.
//!
//! [`TractiveClient`] wraps a `reqwest::Client`, keeps the current
//! [`Session`] and exposes one method per API resource. Handles are cheap to
//! clone and share the same session.
//!
//! After [`TractiveClient::authenticate`] succeeds a background task renews
//! the token `expires_at - 5` seconds later, and keeps doing so for as long
//! as renewal succeeds. Re-authenticating replaces that task;
//! [`TractiveClient::shutdown`] or dropping the last handle cancels it.

use crate::error::{ApiError, Result};
use crate::session::{default_headers, Credentials, Session, TokenResponse};
use crate::time_utils::TimeBound;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Url};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Production API root. Paths are resolved relative to it.
pub const BASE_URL: &str = "https://graph.tractive.com/4/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra pieces of a request beyond method and URL.
#[derive(Debug, Default, Clone)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    /// Replaces the session headers entirely when set.
    pub headers: Option<HeaderMap>,
}

impl RequestOptions {
    pub fn query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.form
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }
}

#[derive(Clone)]
pub struct TractiveClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    base_url: Url,
    credentials: Credentials,
    default_headers: HeaderMap,
    session: watch::Sender<Option<Arc<Session>>>,
    refresh: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let slot = match self.refresh.get_mut() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}

impl TractiveClient {
    /// Client against the production API.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_base_url(credentials, BASE_URL)
    }

    pub fn with_base_url(credentials: Credentials, base_url: &str) -> Result<Self> {
        Self::with_options(credentials, base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_options(credentials: Credentials, base_url: &str, timeout: Duration) -> Result<Self> {
        // Url::join drops the last segment unless the base ends in '/'.
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&base).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;
        let default_headers = default_headers(&credentials.client_id)?;
        let (session, _) = watch::channel(None);

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url,
                credentials,
                default_headers,
                session,
                refresh: Mutex::new(None),
            }),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolves `path` against the API root. One leading `/` is ignored.
    pub fn join_url(&self, path: &str) -> Result<Url> {
        let path = path.strip_prefix('/').unwrap_or(path);
        self.inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    /// `user/{user_id}/` for the logged-in account.
    pub fn create_user_url(&self) -> Result<Url> {
        let user_id = self.user_id()?;
        self.join_url(&format!("user/{user_id}/"))
    }

    pub fn join_user_url(&self, path: &str) -> Result<Url> {
        self.create_user_url()?
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    /// Sends one request and decodes the JSON body.
    ///
    /// Uses the session headers unless `options.headers` is set. Transport,
    /// status and decode failures are each logged once here and returned.
    ///
    /// # Panics
    ///
    /// Panics if `url` is empty.
    pub async fn request(&self, method: Method, url: &str, options: RequestOptions) -> Result<Value> {
        assert!(!url.is_empty(), "request url must not be empty");

        let headers = match options.headers {
            Some(headers) => headers,
            None => self.current_headers(),
        };
        let mut builder = self.inner.http.request(method.clone(), url).headers(headers);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if !options.form.is_empty() {
            builder = builder.form(&options.form);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(%method, url, error = %e, "request failed: transport");
                return Err(ApiError::Transport(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%method, url, %status, body = %body, "request failed: status");
            return Err(ApiError::Status { status, body });
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(%method, url, error = %e, "request failed: transport");
                return Err(ApiError::Transport(e));
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(%method, url, %status, "request ok");
                Ok(value)
            }
            Err(e) => {
                error!(%method, url, error = %e, "request failed: decode");
                Err(ApiError::Decode(e.to_string()))
            }
        }
    }

    async fn get(&self, url: Url) -> Result<Value> {
        self.request(Method::GET, url.as_str(), RequestOptions::default())
            .await
    }

    // ── Authentication ──────────────────────────────────────────────────

    /// Exchanges the credentials for a token and (re)arms the refresh task.
    pub async fn authenticate(&self) -> Result<()> {
        let session = self.fetch_session().await?;
        let delay = session.refresh_delay();
        info!(user_id = %session.user_id, refresh_in = ?delay, "authenticated");
        self.publish(session);
        self.schedule_refresh(delay);
        Ok(())
    }

    /// True once a token has been obtained. Expiry is not checked.
    pub fn authenticated(&self) -> bool {
        self.inner
            .session
            .borrow()
            .as_ref()
            .is_some_and(|s| !s.access_token.is_empty())
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.inner.session.borrow().clone()
    }

    /// Receiver that observes every new session snapshot.
    pub fn session_updates(&self) -> watch::Receiver<Option<Arc<Session>>> {
        self.inner.session.subscribe()
    }

    /// Cancels the pending token refresh, if any.
    pub fn shutdown(&self) {
        if let Some(task) = self.refresh_slot().take() {
            task.abort();
            debug!("token refresh cancelled");
        }
    }

    fn user_id(&self) -> Result<String> {
        self.session()
            .map(|s| s.user_id.clone())
            .ok_or(ApiError::NotAuthenticated)
    }

    fn current_headers(&self) -> HeaderMap {
        match self.inner.session.borrow().as_ref() {
            Some(session) => session.headers().clone(),
            None => self.inner.default_headers.clone(),
        }
    }

    async fn fetch_session(&self) -> Result<Session> {
        let url = self.join_url("auth/token")?;
        let creds = &self.inner.credentials;
        let options = RequestOptions::default().query([
            ("grant_type", "tractive"),
            ("platform_email", creds.email.as_str()),
            ("platform_token", creds.password.as_str()),
        ]);
        let data = self.request(Method::POST, url.as_str(), options).await?;
        let token = TokenResponse::from_value(data)?;
        Session::new(&creds.client_id, token)
    }

    fn publish(&self, session: Session) {
        self.inner.session.send_replace(Some(Arc::new(session)));
    }

    fn refresh_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.inner.refresh.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn schedule_refresh(&self, delay: Duration) {
        let task = tokio::spawn(refresh_loop(Arc::downgrade(&self.inner), delay));
        if let Some(previous) = self.refresh_slot().replace(task) {
            previous.abort();
        }
    }

    // ── Account ─────────────────────────────────────────────────────────

    pub async fn get_account_info(&self) -> Result<Value> {
        self.get(self.create_user_url()?).await
    }

    pub async fn get_account_subscriptions(&self) -> Result<Value> {
        self.get(self.join_user_url("subscriptions")?).await
    }

    pub async fn get_account_subscription(&self, subscription_id: &str) -> Result<Value> {
        self.get(self.join_user_url(&format!("subscription/{subscription_id}"))?)
            .await
    }

    pub async fn get_account_shares(&self) -> Result<Value> {
        self.get(self.join_user_url("shares")?).await
    }

    // ── Trackers ────────────────────────────────────────────────────────

    pub async fn get_all_trackers(&self) -> Result<Value> {
        self.get(self.join_user_url("trackers")?).await
    }

    pub async fn get_tracker(&self, tracker_id: &str) -> Result<Value> {
        self.get(self.join_url(&format!("tracker/{tracker_id}"))?)
            .await
    }

    /// Position history between `start` and `end` in the segmented format.
    ///
    /// Bounds may be preformatted POSIX-second strings or any chrono
    /// date/datetime, see [`TimeBound`].
    pub async fn get_tracker_history(
        &self,
        tracker_id: &str,
        start: impl Into<TimeBound>,
        end: impl Into<TimeBound>,
    ) -> Result<Value> {
        let url = self.join_url(&format!("tracker/{tracker_id}/positions"))?;
        let options = RequestOptions::default().query([
            ("time_from", start.into().to_api_string()),
            ("time_to", end.into().to_api_string()),
            ("format", "json_segments".to_string()),
        ]);
        self.request(Method::GET, url.as_str(), options).await
    }

    /// Last reported position, with a resolved street `address` added.
    pub async fn get_tracker_location(&self, tracker_id: &str) -> Result<Value> {
        let url = self.join_url(&format!("device_pos_report/{tracker_id}"))?;
        let mut data = self.get(url).await?;

        let coord = |i: usize| {
            data.get("latlong")
                .and_then(|ll| ll.get(i))
                .and_then(Value::as_f64)
                .ok_or_else(|| ApiError::missing("latlong"))
        };
        let (latitude, longitude) = (coord(0)?, coord(1)?);

        let location_url = self.join_url("platform/geo/address/location")?;
        let options = RequestOptions::default().query([
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
        ]);
        let address = self
            .request(Method::GET, location_url.as_str(), options)
            .await?
            .get("address")
            .cloned()
            .unwrap_or(Value::Null);

        let obj = data
            .as_object_mut()
            .ok_or_else(|| ApiError::Shape("position report is not an object".into()))?;
        obj.insert("address".to_string(), address);
        Ok(data)
    }

    pub async fn get_tracker_hardware(&self, tracker_id: &str) -> Result<Value> {
        self.get(self.join_url(&format!("device_hw_report/{tracker_id}"))?)
            .await
    }

    /// Battery charge in percent, from the hardware report.
    pub async fn get_tracker_battery(&self, tracker_id: &str) -> Result<u64> {
        self.get_tracker_hardware(tracker_id)
            .await?
            .get("battery_level")
            .and_then(Value::as_u64)
            .ok_or_else(|| ApiError::missing("battery_level"))
    }

    pub async fn get_tracker_geo_fences(&self, tracker_id: &str) -> Result<Value> {
        self.get(self.join_url(&format!("tracker/{tracker_id}/geofences"))?)
            .await
    }

    pub async fn get_geo_fence(&self, fence_id: &str) -> Result<Value> {
        self.get(self.join_url(&format!("geofence/{fence_id}"))?)
            .await
    }

    // ── Pets ────────────────────────────────────────────────────────────

    /// A trackable object, with `details.profile_picture_link` filled in.
    pub async fn get_pet(&self, pet_id: &str) -> Result<Value> {
        let url = self.join_url(&format!("trackable_object/{pet_id}"))?;
        let mut data = self.get(url).await?;

        let details = data
            .get_mut("details")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| ApiError::missing("details"))?;
        let picture_id = match details.get("profile_picture_id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(ApiError::missing("details.profile_picture_id")),
        };
        let link = self.join_url(&format!("media/resource/{picture_id}.png"))?;
        details.insert(
            "profile_picture_link".to_string(),
            Value::String(link.to_string()),
        );
        Ok(data)
    }

    pub async fn get_pets(&self) -> Result<Value> {
        self.get(self.join_user_url("trackable_objects")?).await
    }

    // ── Commands ────────────────────────────────────────────────────────

    pub async fn live_tracking(&self, tracker_id: &str, on: bool) -> Result<Value> {
        self.command(tracker_id, "live_tracking", on).await
    }

    pub async fn led_light(&self, tracker_id: &str, on: bool) -> Result<Value> {
        self.command(tracker_id, "led_control", on).await
    }

    pub async fn buzzer(&self, tracker_id: &str, on: bool) -> Result<Value> {
        self.command(tracker_id, "buzzer_control", on).await
    }

    async fn command(&self, tracker_id: &str, command: &str, on: bool) -> Result<Value> {
        let path = command_path(tracker_id, command, on);
        self.get(self.join_url(&path)?).await
    }
}

fn command_path(tracker_id: &str, command: &str, on: bool) -> String {
    format!("tracker/{tracker_id}/command/{command}/{}", on_off(on))
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

/// Sleeps, renews the token, publishes it and goes around again with the new
/// lifetime. Holds only a weak reference between renewals so the task never
/// keeps a dropped client alive.
async fn refresh_loop(inner: Weak<Inner>, mut delay: Duration) {
    loop {
        tokio::time::sleep(delay).await;
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let client = TractiveClient { inner };
        match client.fetch_session().await {
            Ok(session) => {
                delay = session.refresh_delay();
                info!(user_id = %session.user_id, refresh_in = ?delay, "token refreshed");
                client.publish(session);
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, session will expire");
                return;
            }
        }
    }
}
