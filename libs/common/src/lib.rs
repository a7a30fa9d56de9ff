//! Common library for the member portal client
//!
//! This crate provides the pieces shared by every portal consumer: the user
//! and credential models, credential persistence backends, and the profile
//! completeness checker.

pub mod credentials;
pub mod error;
pub mod models;
pub mod profile;
pub mod redis_store;

pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{StoreError, StoreResult};
pub use models::{CredentialBundle, StoredCredentials, UserRecord};
pub use profile::{ADMIN_FIELDS, ProfileCompletion, check_profile_completion};
pub use redis_store::{RedisConfig, RedisCredentialStore};
