//! Redis-backed credential store
//!
//! The three bundle entries live under a common key prefix and are written
//! in one `MULTI/EXEC` transaction, with an optional TTL playing the role of
//! a cookie expiry.

use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use tracing::info;

use crate::credentials::CredentialStore;
use crate::error::StoreResult;
use crate::models::{CredentialBundle, StoredCredentials, UserRecord};

/// Configuration for the Redis credential store
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Prefix for the credential keys
    pub key_prefix: String,
    /// Expiry applied to every entry, `None` keeps them until cleared
    pub ttl_seconds: Option<u64>,
}

/// Credential store keeping the bundle in Redis
pub struct RedisCredentialStore {
    client: Client,
    config: RedisConfig,
}

impl RedisCredentialStore {
    /// Create a store; no connection is made until the first operation
    pub fn new(config: RedisConfig) -> StoreResult<Self> {
        let client = Client::open(config.url.clone())?;
        info!("Redis credential store initialized with URL: {}", config.url);
        Ok(RedisCredentialStore { client, config })
    }

    async fn get_connection(&self) -> StoreResult<redis::aio::MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }

    fn user_key(&self) -> String {
        format!("{}:user", self.config.key_prefix)
    }

    fn access_key(&self) -> String {
        format!("{}:access_token", self.config.key_prefix)
    }

    fn refresh_key(&self) -> String {
        format!("{}:refresh_token", self.config.key_prefix)
    }

    fn keys(&self) -> Vec<String> {
        vec![self.user_key(), self.access_key(), self.refresh_key()]
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> StoreResult<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[async_trait]
impl CredentialStore for RedisCredentialStore {
    async fn save(&self, bundle: &CredentialBundle) -> StoreResult<()> {
        let user = serde_json::to_string(&bundle.user)?;
        let entries = [
            (self.access_key(), bundle.access_token.as_str()),
            (self.refresh_key(), bundle.refresh_token.as_str()),
            (self.user_key(), user.as_str()),
        ];

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            match self.config.ttl_seconds {
                Some(ttl) => pipe.set_ex(key, value, ttl).ignore(),
                None => pipe.set(key, value).ignore(),
            };
        }

        let mut conn = self.get_connection().await?;
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn load(&self) -> StoreResult<StoredCredentials> {
        let mut conn = self.get_connection().await?;
        let values: Vec<Option<String>> = conn.mget(self.keys()).await?;
        let mut values = values.into_iter();

        let user = match values.next().flatten() {
            Some(raw) => Some(serde_json::from_str::<UserRecord>(&raw)?),
            None => None,
        };

        Ok(StoredCredentials {
            user,
            access_token: values.next().flatten(),
            refresh_token: values.next().flatten(),
        })
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut conn = self.get_connection().await?;
        let _: u64 = conn.del(self.keys()).await?;
        Ok(())
    }
}
