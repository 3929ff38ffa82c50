use thiserror::Error;

use crate::http::HttpError;

/// Why an API call produced no data.
///
/// These never escape the HTTP accessor as `Err`; they ride inside
/// [`ApiOutcome::Failed`](crate::api::ApiOutcome::Failed) so callers can log
/// or inspect them while still treating the call as "no data".
#[derive(Debug, Error)]
pub enum ApiError {
    /// The endpoint and query could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Network or connection error, timeouts included.
    #[error("Network error: {0}")]
    Network(#[from] HttpError),

    /// The server answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Status {
        status: u16,
        message: String,
        /// Structured error body, when the server sent JSON.
        payload: Option<serde_json::Value>,
    },

    /// The body was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status of the failed call, if the server answered at all.
    #[inline]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Structured error payload returned by the server, if any.
    #[inline]
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Status { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }
}

/// Errors that can occur while setting up a tally.
///
/// Once constructed, a tally never fails; see [`crate::aggregate`].
#[derive(Debug, Error)]
pub enum TallyError {
    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] HttpError),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which is useful for errors
/// that include backtraces or multi-line details.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for setup operations.
pub type Result<T> = std::result::Result<T, TallyError>;
