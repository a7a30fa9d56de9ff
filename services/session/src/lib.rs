//! Member portal session service
//!
//! Restores and tracks the member's session against the portal REST API:
//! startup token refresh, login, confirmed logout, and the route-scoped
//! profile completeness poller. Consumers observe [`SessionState`] through
//! [`SessionController::subscribe`] and answer prompts by calling back into
//! the controller.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use common::MemoryCredentialStore;
//! use session::{HttpPortalApi, ProfileCompletionGuard, RoutePolicy, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let api = HttpPortalApi::new("http://localhost:8000/api", Duration::from_secs(30))?;
//!     let controller = Arc::new(SessionController::new(
//!         Arc::new(api),
//!         Arc::new(MemoryCredentialStore::new()),
//!     ));
//!     controller.bootstrap().await;
//!
//!     let mut guard = ProfileCompletionGuard::new(
//!         controller.clone(),
//!         RoutePolicy::default(),
//!         Duration::from_secs(10),
//!     );
//!     guard.navigate("/member/dashboard");
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod guard;
pub mod notifications;
pub mod prompt;
pub mod scope;

pub use api::{HttpPortalApi, LoginData, PortalApi, RefreshedSession};
pub use config::{CredentialBackend, SessionConfig};
pub use controller::{SessionController, SessionPhase, SessionState};
pub use error::{ApiError, ApiResult};
pub use guard::{DEFAULT_POLL_INTERVAL, ProfileCompletionGuard, RoutePolicy};
pub use notifications::{Notification, NotificationFeed};
pub use prompt::{Prompt, PromptWatcher, open_profile_page};
pub use scope::ScopedTask;
