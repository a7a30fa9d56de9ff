//! Session service configuration

use std::path::PathBuf;
use std::time::Duration;

use common::RedisConfig;
use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::guard::DEFAULT_POLL_INTERVAL;

/// Where the credential bundle is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    File,
    Redis,
    Memory,
}

/// Session service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Root URL of the portal REST API
    pub api_base_url: String,
    /// Per-request timeout in seconds (default: 30)
    pub request_timeout_secs: u64,
    /// Seconds between profile and notification checks (default: 10)
    pub poll_interval_secs: u64,
    pub credential_backend: CredentialBackend,
    /// Credentials file for the `file` backend
    pub credentials_path: PathBuf,
    /// Redis URL for the `redis` backend
    pub redis_url: String,
    /// Prefix of the Redis credential keys
    pub redis_key_prefix: String,
    /// Expiry of Redis entries in seconds, unset keeps them until logout
    pub credential_ttl_secs: Option<u64>,
    /// Location the driver navigates to after startup
    pub start_route: String,
}

impl SessionConfig {
    /// Load the configuration from environment variables
    ///
    /// # Environment Variables
    /// - `PORTAL_API_BASE_URL`: portal API root (default: "http://localhost:8000/api")
    /// - `PORTAL_REQUEST_TIMEOUT_SECS`: request timeout (default: 30)
    /// - `PORTAL_POLL_INTERVAL_SECS`: poll period (default: 10)
    /// - `PORTAL_CREDENTIAL_BACKEND`: `file`, `redis` or `memory` (default: file)
    /// - `PORTAL_CREDENTIALS_PATH`: credentials file (default: ".portal/credentials.json")
    /// - `PORTAL_REDIS_URL`: Redis URL (default: "redis://localhost:6379")
    /// - `PORTAL_REDIS_KEY_PREFIX`: Redis key prefix (default: "portal:credentials")
    /// - `PORTAL_CREDENTIAL_TTL_SECS`: Redis entry expiry (default: none)
    /// - `PORTAL_START_ROUTE`: first location (default: "/member/dashboard")
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: SessionConfig = Config::builder()
            .set_default("api_base_url", "http://localhost:8000/api")?
            .set_default("request_timeout_secs", 30)?
            .set_default("poll_interval_secs", DEFAULT_POLL_INTERVAL.as_secs() as i64)?
            .set_default("credential_backend", "file")?
            .set_default("credentials_path", ".portal/credentials.json")?
            .set_default("redis_url", "redis://localhost:6379")?
            .set_default("redis_key_prefix", "portal:credentials")?
            .set_default("start_route", "/member/dashboard")?
            .add_source(Environment::with_prefix("PORTAL").try_parsing(true))
            .build()?
            .try_deserialize()?;

        if config.poll_interval_secs == 0 {
            return Err(ConfigError::Message(
                "PORTAL_POLL_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Settings for the `redis` backend
    pub fn redis_config(&self) -> RedisConfig {
        RedisConfig {
            url: self.redis_url.clone(),
            key_prefix: self.redis_key_prefix.clone(),
            ttl_seconds: self.credential_ttl_secs,
        }
    }
}
