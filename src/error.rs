//! Failure type of the backend seam.

use thiserror::Error;

/// Errors that can occur when talking to the listings backend.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure: connection refused, timeout, TLS, ...
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status} from {path}")]
    Status { status: u16, path: String },

    /// The credential was missing or rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// The body could not be used.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The request was superseded or aborted. Not a failure.
    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
