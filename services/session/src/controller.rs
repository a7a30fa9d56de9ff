//! Session lifecycle controller
//!
//! [`SessionController`] is the single owner of the member's session. It
//! restores the session at startup, records explicit logins, runs the
//! two-step logout, and keeps the sticky "profile incomplete" flag. State is
//! published through a `watch` channel; consumers subscribe and call back
//! into the controller, they never mutate the state themselves.
//!
//! None of the operations return errors. Transport, server and storage
//! failures are logged and turned into a state transition or a no-op, and
//! the worst outcome is always "signed out".

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use common::{
    ADMIN_FIELDS, CredentialBundle, CredentialStore, ProfileCompletion, UserRecord,
    check_profile_completion,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::{LoginData, PortalApi};

/// Where the session currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Bootstrapping,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of the session published to consumers
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<UserRecord>,
    /// True until the startup bootstrap has resolved
    pub is_loading: bool,
    pub show_logout_confirmation: bool,
    /// Sticky; only lowered by [`SessionController::dismiss_profile_prompt`]
    pub profile_incomplete: bool,
    pub last_profile_check: Option<ProfileCompletion>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            is_loading: true,
            show_logout_confirmation: false,
            profile_incomplete: false,
            last_profile_check: None,
        }
    }
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.user, self.is_loading) {
            (Some(_), _) => SessionPhase::Authenticated,
            (None, true) => SessionPhase::Bootstrapping,
            (None, false) => SessionPhase::Unauthenticated,
        }
    }
}

/// Owner of the member session
pub struct SessionController {
    api: Arc<dyn PortalApi>,
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<SessionState>,
    bootstrapped: AtomicBool,
    /// Last ticket handed to a profile check
    issued_checks: AtomicU64,
    /// Newest ticket whose result reached the state
    applied_checks: AtomicU64,
}

impl SessionController {
    pub fn new(api: Arc<dyn PortalApi>, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            api,
            store,
            state,
            bootstrapped: AtomicBool::new(false),
            issued_checks: AtomicU64::new(0),
            applied_checks: AtomicU64::new(0),
        }
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Current state snapshot
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn api(&self) -> Arc<dyn PortalApi> {
        self.api.clone()
    }

    /// Access token of the stored bundle, if any
    pub async fn access_token(&self) -> Option<String> {
        match self.store.load().await {
            Ok(stored) => stored.access_token,
            Err(e) => {
                warn!("Failed to read stored credentials: {}", e);
                None
            }
        }
    }

    /// Restore the session from persisted credentials
    ///
    /// Runs once; later calls are ignored. Whatever happens, the loading flag
    /// is lowered exactly once when this returns.
    pub async fn bootstrap(&self) {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            warn!("Session bootstrap already ran, ignoring");
            return;
        }

        info!("Bootstrapping session");
        let user = self.restore_session().await;

        match &user {
            Some(user) => info!("Session restored for {}", user.display_name()),
            None => info!("No session to restore, starting signed out"),
        }

        self.state.send_modify(|state| {
            state.user = user;
            state.is_loading = false;
        });
    }

    async fn restore_session(&self) -> Option<UserRecord> {
        let stored = match self.store.load().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Stored credentials are unreadable: {}", e);
                self.clear_credentials().await;
                return None;
            }
        };

        let Some(refresh_token) = stored.refresh_token else {
            self.clear_credentials().await;
            return None;
        };

        if stored.user.is_none() || stored.access_token.is_none() {
            warn!("Stored credentials are incomplete, discarding them");
            self.clear_credentials().await;
            return None;
        }

        let refreshed = match self.api.refresh_token(&refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(e) if e.is_unauthorized() => {
                info!("Refresh token rejected by the portal, signing out");
                self.clear_credentials().await;
                return None;
            }
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                self.clear_credentials().await;
                return None;
            }
        };

        // The refresh token is not rotated by this endpoint
        let bundle = CredentialBundle::new(refreshed.user.clone(), refreshed.access, refresh_token);
        self.persist(&bundle).await;

        Some(refreshed.user)
    }

    /// Record a completed credential exchange
    ///
    /// No network call and no token validation happen here; the login form
    /// already talked to the portal.
    ///
    /// Assumes [`bootstrap`](Self::bootstrap) has already resolved. A login
    /// that lands while bootstrap is still running can be overwritten by it.
    pub async fn login(&self, data: LoginData) {
        let LoginData {
            user,
            access,
            refresh,
        } = data;

        self.persist(&CredentialBundle::new(user.clone(), access, refresh))
            .await;

        info!("Signed in as {}", user.display_name());
        self.state.send_modify(|state| state.user = Some(user));
    }

    /// Ask for confirmation before signing out
    pub fn request_logout(&self) {
        self.state.send_if_modified(|state| {
            let changed = !state.show_logout_confirmation;
            state.show_logout_confirmation = true;
            changed
        });
    }

    /// Sign out: forget the credentials and the user
    pub async fn confirm_logout(&self) {
        self.clear_credentials().await;

        self.state.send_modify(|state| {
            if let Some(user) = state.user.take() {
                info!("Signed out {}", user.display_name());
            }
            state.show_logout_confirmation = false;
        });
    }

    /// Keep the session and hide the confirmation
    pub fn cancel_logout(&self) {
        self.state.send_if_modified(|state| {
            let changed = state.show_logout_confirmation;
            state.show_logout_confirmation = false;
            changed
        });
    }

    /// Lower the profile prompt flag
    pub fn dismiss_profile_prompt(&self) {
        self.state.send_if_modified(|state| {
            let changed = state.profile_incomplete;
            state.profile_incomplete = false;
            changed
        });
    }

    /// Fetch the member's profile and raise the prompt flag if it has gaps
    ///
    /// Returns the applied result, or `None` when the check was skipped,
    /// failed, or was overtaken by a newer check. Failures leave the flag
    /// as it was.
    pub async fn run_profile_completion_check(&self) -> Option<ProfileCompletion> {
        if !self.state.borrow().is_authenticated() {
            debug!("Not signed in, skipping profile completion check");
            return None;
        }

        let ticket = self.issued_checks.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(access_token) = self.access_token().await else {
            warn!("No access token stored, skipping profile completion check");
            return None;
        };

        let profile = match self.api.current_user(&access_token).await {
            Ok(profile) => profile,
            Err(e) if e.is_unauthorized() => {
                warn!("Access token rejected, skipping profile completion check");
                return None;
            }
            Err(e) => {
                error!("Profile completion check failed: {}", e);
                return None;
            }
        };

        let completion = check_profile_completion(&profile, &ADMIN_FIELDS);
        debug!(
            "Profile check #{}: {}% complete",
            ticket, completion.completion_percentage
        );

        self.apply_profile_check(ticket, completion)
    }

    fn apply_profile_check(
        &self,
        ticket: u64,
        completion: ProfileCompletion,
    ) -> Option<ProfileCompletion> {
        let newest = self.applied_checks.fetch_max(ticket, Ordering::SeqCst);
        if newest > ticket {
            debug!("Discarding profile check #{}, #{} already applied", ticket, newest);
            return None;
        }

        let applied = self.state.send_if_modified(|state| {
            // The member may have signed out while the request was in flight
            if !state.is_authenticated() {
                return false;
            }
            if !completion.is_complete && !state.profile_incomplete {
                info!(
                    "Profile incomplete, missing: {}",
                    completion.incomplete_fields.join(", ")
                );
                state.profile_incomplete = true;
            }
            state.last_profile_check = Some(completion.clone());
            true
        });

        applied.then_some(completion)
    }

    async fn persist(&self, bundle: &CredentialBundle) {
        if let Err(e) = self.store.save(bundle).await {
            error!("Failed to persist credentials: {}", e);
            // Never leave a partial bundle behind
            self.clear_credentials().await;
        }
    }

    async fn clear_credentials(&self) {
        if let Err(e) = self.store.clear().await {
            error!("Failed to clear stored credentials: {}", e);
        }
    }
}
