//! Custom error types for the common library
//!
//! This module defines the errors raised by credential store backends.

use thiserror::Error;

/// Custom error type for credential store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error occurred while reading or writing the credentials file
    #[error("Credential file error: {0}")]
    Io(#[from] std::io::Error),

    /// Error occurred while talking to Redis
    #[error("Credential cache error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Stored value could not be encoded or decoded
    #[error("Credential serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
