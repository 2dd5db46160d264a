//! Error types for the Tractive client, the map renderer and the exporters.

use reqwest::StatusCode;

/// Failure of a single API call.
///
/// `Transport`, `Decode` and `Status` are logged by the request wrapper
/// where they are produced, so callers only need to decide what to do with
/// them.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection refused, timeout, TLS failure and the like.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered 2xx but the body was not valid JSON.
    #[error("could not decode response body: {0}")]
    Decode(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The JSON was valid but did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// An accessor that needs the user id was called before `authenticate`.
    #[error("client is not authenticated")]
    NotAuthenticated,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A configured value (the client id) cannot be sent as a header.
    #[error("invalid header value: {0}")]
    InvalidHeader(String),
}

impl ApiError {
    pub(crate) fn missing(field: &str) -> Self {
        ApiError::Shape(format!("missing or invalid field `{field}`"))
    }
}

/// Reasons a set of pet tracks cannot be turned into a map.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MapError {
    #[error("no pet tracks to plot")]
    Empty,

    #[error("track for `{0}` has no positions")]
    EmptySeries(String),

    #[error("{count} tracks but only {palette} marker colors available")]
    TooManySeries { count: usize, palette: usize },
}

/// Failure writing history or map data to disk.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result alias for API calls.
pub type Result<T> = std::result::Result<T, ApiError>;
