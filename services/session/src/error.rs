//! Custom error types for the session service

use thiserror::Error;

/// Errors returned by the portal REST API client
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request never produced a response, or the body could not be read
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Portal answered with a non-success status
    #[error("Portal returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Base URL and endpoint path do not form a valid URL
    #[error("Invalid portal URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Whether the portal rejected the credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401 | 403, .. })
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
