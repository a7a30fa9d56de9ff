//! Prompts raised by the session for the member to answer

use tokio::sync::watch;

use crate::controller::{SessionController, SessionState};
use crate::guard::ProfileCompletionGuard;

pub const LOGOUT_CONFIRMATION_TEXT: &str = "Are you sure you want to log out?";
pub const PROFILE_COMPLETION_TITLE: &str = "Profile Completion Required";
pub const PROFILE_COMPLETION_TEXT: &str = "Completing your profile is essential to unlock the \
     full potential of your membership. Please take a moment to complete your profile to proceed.";

/// Something the member is being asked to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Answer with `confirm_logout` or `cancel_logout`
    LogoutConfirmation,
    /// Answer with [`open_profile_page`] or `dismiss_profile_prompt`
    ProfileCompletion,
}

impl Prompt {
    pub fn text(&self) -> &'static str {
        match self {
            Prompt::LogoutConfirmation => LOGOUT_CONFIRMATION_TEXT,
            Prompt::ProfileCompletion => PROFILE_COMPLETION_TEXT,
        }
    }
}

/// Prompts currently raised in `state`
pub fn pending_prompts(state: &SessionState) -> Vec<Prompt> {
    let mut prompts = Vec::new();
    if state.show_logout_confirmation {
        prompts.push(Prompt::LogoutConfirmation);
    }
    if state.profile_incomplete {
        prompts.push(Prompt::ProfileCompletion);
    }
    prompts
}

/// Yields each prompt once, when it goes from hidden to shown
pub struct PromptWatcher {
    rx: watch::Receiver<SessionState>,
    shown: Vec<Prompt>,
}

impl PromptWatcher {
    pub fn new(mut rx: watch::Receiver<SessionState>) -> Self {
        let shown = pending_prompts(&rx.borrow_and_update());
        Self { rx, shown }
    }

    /// Wait for newly raised prompts; `None` once the controller is gone
    pub async fn next(&mut self) -> Option<Vec<Prompt>> {
        loop {
            self.rx.changed().await.ok()?;
            let now = pending_prompts(&self.rx.borrow_and_update());
            let raised: Vec<Prompt> = now
                .iter()
                .copied()
                .filter(|p| !self.shown.contains(p))
                .collect();
            self.shown = now;
            if !raised.is_empty() {
                return Some(raised);
            }
        }
    }
}

/// Send the member to the profile editor
///
/// Navigates first so the guard is already out of scope when the prompt is
/// lowered, otherwise the dismissal would trigger a recheck.
pub fn open_profile_page(guard: &mut ProfileCompletionGuard, controller: &SessionController) {
    let route = guard.policy().profile_route.clone();
    guard.navigate(&route);
    controller.dismiss_profile_prompt();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{LoginData, MockPortal};
    use crate::guard::RoutePolicy;
    use common::{MemoryCredentialStore, UserRecord};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn signed_in(api: MockPortal) -> Arc<SessionController> {
        let controller = Arc::new(SessionController::new(
            Arc::new(api),
            Arc::new(MemoryCredentialStore::new()),
        ));
        let user: UserRecord = serde_json::from_value(json!({"full_name": "Ada"})).unwrap();
        controller
            .login(LoginData {
                user,
                access: "access".to_string(),
                refresh: "refresh".to_string(),
            })
            .await;
        controller
    }

    #[test]
    fn test_pending_prompts() {
        let mut state = SessionState::default();
        assert!(pending_prompts(&state).is_empty());

        state.show_logout_confirmation = true;
        state.profile_incomplete = true;
        assert_eq!(
            pending_prompts(&state),
            vec![Prompt::LogoutConfirmation, Prompt::ProfileCompletion]
        );
        assert_eq!(Prompt::LogoutConfirmation.text(), LOGOUT_CONFIRMATION_TEXT);
    }

    #[tokio::test]
    async fn test_watcher_reports_rising_edges_once() {
        let controller = signed_in(MockPortal::new()).await;
        let mut watcher = PromptWatcher::new(controller.subscribe());

        controller.request_logout();
        assert_eq!(watcher.next().await, Some(vec![Prompt::LogoutConfirmation]));

        // Hiding a prompt is not reported
        controller.cancel_logout();
        let hidden = tokio::time::timeout(Duration::from_millis(20), watcher.next()).await;
        assert!(hidden.is_err());

        controller.request_logout();
        assert_eq!(watcher.next().await, Some(vec![Prompt::LogoutConfirmation]));
    }

    #[tokio::test]
    async fn test_watcher_ends_with_controller() {
        let controller = signed_in(MockPortal::new()).await;
        let mut watcher = PromptWatcher::new(controller.subscribe());

        drop(controller);
        assert_eq!(watcher.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_profile_page_does_not_recheck() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut api = MockPortal::new();
        api.expect_current_user().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"full_name": "Ada", "phone": ""}))
        });
        let controller = signed_in(api).await;
        let mut guard = ProfileCompletionGuard::new(
            controller.clone(),
            RoutePolicy::default(),
            Duration::from_secs(10),
        );

        guard.navigate("/member/dashboard");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(controller.state().profile_incomplete);

        open_profile_page(&mut guard, &controller);
        assert_eq!(guard.location(), Some("/member/profile"));
        assert!(!guard.is_active());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!controller.state().profile_incomplete);
    }
}
