//! Credential persistence
//!
//! A [`CredentialStore`] keeps the user record, access token and refresh
//! token of the signed-in member. Every backend writes the three entries as
//! one unit, so a reader never observes a token without its user.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StoreResult;
use crate::models::{CredentialBundle, StoredCredentials};

/// Persistence port for the credential bundle
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Write user, access token and refresh token as a single unit
    async fn save(&self, bundle: &CredentialBundle) -> StoreResult<()>;

    /// Return whatever subset of the bundle is present
    async fn load(&self) -> StoreResult<StoredCredentials>;

    /// Remove every entry; succeeds when nothing is stored
    async fn clear(&self) -> StoreResult<()>;
}

/// Process-local store, used by tests and the `memory` backend
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<StoredCredentials>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from arbitrary, possibly partial, contents
    pub fn with_contents(contents: StoredCredentials) -> Self {
        Self {
            slot: Mutex::new(contents),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn save(&self, bundle: &CredentialBundle) -> StoreResult<()> {
        *self.slot.lock().await = bundle.clone().into();
        Ok(())
    }

    async fn load(&self) -> StoreResult<StoredCredentials> {
        Ok(self.slot.lock().await.clone())
    }

    async fn clear(&self) -> StoreResult<()> {
        *self.slot.lock().await = StoredCredentials::default();
        Ok(())
    }
}

/// JSON file store
///
/// The bundle is written to a sibling temporary file and renamed over the
/// target, so the file on disk is always either the old or the new bundle.
/// On unix the file is created readable by its owner only.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "credentials".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn save(&self, bundle: &CredentialBundle) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_vec_pretty(&StoredCredentials::from(bundle.clone()))?;
        let temp = self.temp_path();

        // A leftover temp file would keep its old mode
        match tokio::fs::remove_file(&temp).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&temp).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp, &self.path).await?;
        debug!("Credentials written to {}", self.path.display());
        Ok(())
    }

    async fn load(&self) -> StoreResult<StoredCredentials> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredCredentials::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> StoreResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Removed credentials file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
