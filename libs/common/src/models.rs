//! User record and credential bundle models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User record as returned by the portal API
///
/// The record is kept as an ordered JSON object so that fields the client
/// does not know about survive a save/load cycle untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRecord(Map<String, Value>);

impl UserRecord {
    /// Get a raw field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn full_name(&self) -> Option<&str> {
        self.get("full_name").and_then(Value::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.get("email").and_then(Value::as_str)
    }

    pub fn is_admin(&self) -> bool {
        self.get("is_admin")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Name to show in logs and prompts
    pub fn display_name(&self) -> &str {
        self.full_name()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.email())
            .unwrap_or("member")
    }
}

/// User, access token and refresh token, persisted together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub user: UserRecord,
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialBundle {
    pub fn new(
        user: UserRecord,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            user,
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

/// Whatever subset of a bundle a store currently holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub user: Option<UserRecord>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl StoredCredentials {
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// A complete bundle, or `None` when any part is missing
    pub fn into_bundle(self) -> Option<CredentialBundle> {
        match (self.user, self.access_token, self.refresh_token) {
            (Some(user), Some(access_token), Some(refresh_token)) => Some(CredentialBundle {
                user,
                access_token,
                refresh_token,
            }),
            _ => None,
        }
    }
}

impl From<CredentialBundle> for StoredCredentials {
    fn from(bundle: CredentialBundle) -> Self {
        Self {
            user: Some(bundle.user),
            access_token: Some(bundle.access_token),
            refresh_token: Some(bundle.refresh_token),
        }
    }
}
