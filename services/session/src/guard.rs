//! Route-scoped profile completeness poller
//!
//! While the member browses the member area (but not the profile editor),
//! the guard rechecks profile completeness on a fixed interval. Leaving the
//! area, or dropping the guard, stops the timer and any check in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::controller::SessionController;
use crate::scope::ScopedTask;

/// Default period between completeness checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Which navigation locations the poller applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    pub member_prefix: String,
    pub profile_route: String,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            member_prefix: "/member".to_string(),
            profile_route: "/member/profile".to_string(),
        }
    }
}

impl RoutePolicy {
    /// Inside the member area and not on the profile editor
    pub fn applies(&self, path: &str) -> bool {
        path.starts_with(&self.member_prefix) && path != self.profile_route
    }
}

/// Starts and stops the completeness poller as the location changes
pub struct ProfileCompletionGuard {
    controller: Arc<SessionController>,
    policy: RoutePolicy,
    interval: Duration,
    location: Option<String>,
    task: Option<ScopedTask>,
}

impl ProfileCompletionGuard {
    pub fn new(controller: Arc<SessionController>, policy: RoutePolicy, interval: Duration) -> Self {
        Self {
            controller,
            policy,
            interval,
            location: None,
            task: None,
        }
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(ScopedTask::is_running)
    }

    /// React to a navigation
    ///
    /// Every new in-scope location restarts the poller with an immediate
    /// check; an out-of-scope location stops it.
    pub fn navigate(&mut self, path: &str) {
        if self.location.as_deref() == Some(path) {
            return;
        }
        self.location = Some(path.to_string());

        // Release the previous scope before acquiring the next one
        if self.task.take().is_some() {
            debug!("Profile completion poller stopped");
        }

        if self.policy.applies(path) {
            info!("Profile completion poller active on {}", path);
            let controller = self.controller.clone();
            let interval = self.interval;
            self.task = Some(ScopedTask::spawn(move |cancel| {
                poll_profile_completion(controller, interval, cancel)
            }));
        }
    }
}

async fn poll_profile_completion(
    controller: Arc<SessionController>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut state_rx = controller.subscribe();
    let mut prompt_shown = state_rx.borrow_and_update().profile_incomplete;

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut check_now = !prompt_shown;
    loop {
        if check_now {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = controller.run_profile_completion_check() => {}
            }
        }

        check_now = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if prompt_shown {
                    debug!("Profile prompt open, skipping check");
                }
                !prompt_shown
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let shown = state_rx.borrow_and_update().profile_incomplete;
                let dismissed = prompt_shown && !shown;
                prompt_shown = shown;
                if dismissed {
                    ticker.reset();
                }
                dismissed
            }
        };
    }

    debug!("Profile completion poller exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{LoginData, MockPortal};
    use common::{MemoryCredentialStore, UserRecord};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PERIOD: Duration = Duration::from_secs(10);

    fn counting_portal(calls: Arc<AtomicUsize>, profile: Value) -> MockPortal {
        let mut api = MockPortal::new();
        api.expect_current_user().returning(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(profile.clone())
        });
        api
    }

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

    fn complete() -> Value {
        json!({"full_name": "Ada", "phone": "0700"})
    }

    fn incomplete() -> Value {
        json!({"full_name": "Ada", "phone": ""})
    }

    #[test]
    fn test_route_policy() {
        let policy = RoutePolicy::default();
        assert!(policy.applies("/member"));
        assert!(policy.applies("/member/dashboard"));
        assert!(policy.applies("/member/profile/edit"));
        assert!(!policy.applies("/member/profile"));
        assert!(!policy.applies("/"));
        assert!(!policy.applies("/admin/membership"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_inside_member_area() {
        let calls = Arc::new(AtomicUsize::new(0));
        let controller = signed_in(counting_portal(calls.clone(), complete())).await;
        let mut guard = ProfileCompletionGuard::new(controller, RoutePolicy::default(), PERIOD);

        guard.navigate("/member/dashboard");
        assert!(guard.is_active());

        // Immediate check, then one at 10s and one at 20s
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_member_area_stops_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let controller = signed_in(counting_portal(calls.clone(), complete())).await;
        let mut guard = ProfileCompletionGuard::new(controller, RoutePolicy::default(), PERIOD);

        guard.navigate("/member/dashboard");
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        guard.navigate("/");
        assert!(!guard.is_active());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_profile_page_is_not_polled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let controller = signed_in(counting_portal(calls.clone(), incomplete())).await;
        let mut guard = ProfileCompletionGuard::new(controller, RoutePolicy::default(), PERIOD);

        guard.navigate("/member/profile");
        assert!(!guard.is_active());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_guard_stops_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let controller = signed_in(counting_portal(calls.clone(), complete())).await;
        let mut guard = ProfileCompletionGuard::new(controller, RoutePolicy::default(), PERIOD);

        guard.navigate("/member/resources");
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(guard);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_ticks_while_prompt_is_shown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let controller = signed_in(counting_portal(calls.clone(), incomplete())).await;
        let mut guard =
            ProfileCompletionGuard::new(controller.clone(), RoutePolicy::default(), PERIOD);

        guard.navigate("/member/dashboard");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(controller.state().profile_incomplete);

        tokio::time::sleep(Duration::from_secs(40)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismissing_prompt_triggers_recheck() {
        let calls = Arc::new(AtomicUsize::new(0));
        let controller = signed_in(counting_portal(calls.clone(), incomplete())).await;
        let mut guard =
            ProfileCompletionGuard::new(controller.clone(), RoutePolicy::default(), PERIOD);

        guard.navigate("/member/dashboard");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        controller.dismiss_profile_prompt();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(controller.state().profile_incomplete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_location_does_not_restart() {
        let calls = Arc::new(AtomicUsize::new(0));
        let controller = signed_in(counting_portal(calls.clone(), complete())).await;
        let mut guard = ProfileCompletionGuard::new(controller, RoutePolicy::default(), PERIOD);

        guard.navigate("/member/dashboard");
        tokio::time::sleep(Duration::from_secs(1)).await;
        guard.navigate("/member/dashboard");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        guard.navigate("/member/journal");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(guard.location(), Some("/member/journal"));
    }
}
