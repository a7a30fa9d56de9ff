//! Portal REST API client
//!
//! The session layer talks to three endpoints: token refresh, current user
//! and the notification list. [`PortalApi`] is the seam the controller and
//! the pollers depend on; [`HttpPortalApi`] is the `reqwest` implementation.

use std::time::Duration;

use async_trait::async_trait;
use common::UserRecord;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::notifications::Notification;

/// Path of the token refresh endpoint
pub const TOKEN_REFRESH_PATH: &str = "auth/token/refresh/";
/// Path of the current user endpoint
pub const CURRENT_USER_PATH: &str = "auth/user/";
/// Path of the member notification list
pub const NOTIFICATIONS_PATH: &str = "accounts/user/notifications/";

/// Request for token refresh
#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest<'a> {
    pub refresh: &'a str,
}

/// Response for token refresh
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefreshedSession {
    pub user: UserRecord,
    pub access: String,
}

/// Result of a credential exchange performed by the login form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginData {
    pub user: UserRecord,
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
struct NotificationPage {
    results: Vec<Notification>,
}

/// Remote portal operations used by the session layer
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// Exchange a refresh token for a new access token and the user record
    async fn refresh_token(&self, refresh: &str) -> ApiResult<RefreshedSession>;

    /// Fetch the signed-in member's profile record
    async fn current_user(&self, access_token: &str) -> ApiResult<Value>;

    /// Fetch the member's notifications, read and unread
    async fn notifications(&self, access_token: &str) -> ApiResult<Vec<Notification>>;
}

/// `reqwest` implementation of [`PortalApi`]
#[derive(Clone)]
pub struct HttpPortalApi {
    client: Client,
    base_url: Url,
}

impl HttpPortalApi {
    /// Create a client for the portal rooted at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    /// Create a client reusing an existing `reqwest::Client`
    pub fn with_client(client: Client, base_url: &str) -> ApiResult<Self> {
        // Url::join drops the last segment unless the base ends with a slash
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn expect_success(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Portal request failed with status {}", status);
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PortalApi for HttpPortalApi {
    async fn refresh_token(&self, refresh: &str) -> ApiResult<RefreshedSession> {
        let url = self.endpoint(TOKEN_REFRESH_PATH)?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(&RefreshTokenRequest { refresh })
            .send()
            .await?;

        Ok(Self::expect_success(response).await?.json().await?)
    }

    async fn current_user(&self, access_token: &str) -> ApiResult<Value> {
        let url = self.endpoint(CURRENT_USER_PATH)?;
        debug!("GET {}", url);

        let response = self.client.get(url).bearer_auth(access_token).send().await?;

        Ok(Self::expect_success(response).await?.json().await?)
    }

    async fn notifications(&self, access_token: &str) -> ApiResult<Vec<Notification>> {
        let url = self.endpoint(NOTIFICATIONS_PATH)?;
        debug!("GET {}", url);

        let response = self.client.get(url).bearer_auth(access_token).send().await?;
        let page: NotificationPage = Self::expect_success(response).await?.json().await?;

        Ok(page.results)
    }
}

#[cfg(test)]
mockall::mock! {
    pub Portal {}

    #[async_trait]
    impl PortalApi for Portal {
        async fn refresh_token(&self, refresh: &str) -> ApiResult<RefreshedSession>;
        async fn current_user(&self, access_token: &str) -> ApiResult<Value>;
        async fn notifications(&self, access_token: &str) -> ApiResult<Vec<Notification>>;
    }
}
