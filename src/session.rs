//! Credentials and the authenticated session snapshot.
//!
//! A [`Session`] is immutable once built. Re-authentication produces a new
//! snapshot which the client publishes as a whole, so a request never sees a
//! header set that mixes an old token with new fields.

use crate::error::ApiError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::time::Duration;

/// Header carrying the registered client identifier.
pub const CLIENT_HEADER: &str = "x-tractive-client";

/// How long before `expires_at` the token is refreshed.
pub const REFRESH_MARGIN_SECS: u64 = 5;

/// Account credentials plus the client identifier issued by Tractive.
#[derive(Clone, Default)]
pub struct Credentials {
    pub client_id: String,
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// Reads `TRACTIVE_CLIENT`, `TRACTIVE_USER` and `TRACTIVE_PASSWORD`,
    /// loading a `.env` file first if one exists. Unset variables become
    /// empty strings.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self {
            client_id: var("TRACTIVE_CLIENT"),
            email: var("TRACTIVE_USER"),
            password: var("TRACTIVE_PASSWORD"),
        }
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of a successful `auth/token` call.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub user_id: String,
    pub expires_at: u64,
}

impl TokenResponse {
    pub fn from_value(value: serde_json::Value) -> Result<Self, ApiError> {
        let field = |name: &str| value.get(name).ok_or_else(|| ApiError::missing(name));
        let access_token = field("access_token")?
            .as_str()
            .ok_or_else(|| ApiError::missing("access_token"))?
            .to_string();
        // user_id has been seen both as a string and as a number.
        let user_id = match field("user_id")? {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return Err(ApiError::missing("user_id")),
        };
        let expires_at = match field("expires_at")? {
            // Floats such as 3600.0 are truncated to whole seconds.
            serde_json::Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            }),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| ApiError::missing("expires_at"))?;

        Ok(Self {
            access_token,
            user_id,
            expires_at,
        })
    }
}

/// A logged-in session: token, owner and the headers to send with it.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub user_id: String,
    pub expires_at: u64,
    headers: HeaderMap,
}

impl Session {
    pub fn new(client_id: &str, token: TokenResponse) -> Result<Self, ApiError> {
        let mut headers = default_headers(client_id)?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token.access_token))
            .map_err(|_| ApiError::Shape("access_token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(Self {
            access_token: token.access_token,
            user_id: token.user_id,
            expires_at: token.expires_at,
            headers,
        })
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Delay until the refresh fires: `expires_at - 5` seconds from now.
    pub fn refresh_delay(&self) -> Duration {
        refresh_delay(self.expires_at)
    }
}

/// `expires_at` is treated as a lifetime in seconds, not an absolute epoch.
/// Never shorter than one second so a tiny lifetime cannot spin the refresh.
pub fn refresh_delay(expires_at: u64) -> Duration {
    Duration::from_secs(expires_at.saturating_sub(REFRESH_MARGIN_SECS).max(1))
}

/// Headers sent before any token has been obtained.
pub fn default_headers(client_id: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    let client = HeaderValue::from_str(client_id)
        .map_err(|_| ApiError::InvalidHeader(format!("client id `{client_id}`")))?;
    headers.insert(HeaderName::from_static(CLIENT_HEADER), client);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}
