use std::sync::Arc;

use anyhow::Result;
use common::{CredentialStore, FileCredentialStore, MemoryCredentialStore, RedisCredentialStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use session::{
    CredentialBackend, HttpPortalApi, LoginData, NotificationFeed, ProfileCompletionGuard, Prompt,
    PromptWatcher, RoutePolicy, ScopedTask, SessionConfig, SessionController, open_profile_page,
};

const HELP: &str = "commands: goto <path> | login <json> | logout | confirm | cancel | \
                    profile | dismiss | notifications | status | quit";

/// Terminal stand-in for the portal UI
struct Driver {
    controller: Arc<SessionController>,
    guard: ProfileCompletionGuard,
    feed: Arc<NotificationFeed>,
    feed_task: Option<ScopedTask>,
    policy: RoutePolicy,
}

impl Driver {
    fn navigate(&mut self, path: &str) {
        info!("Navigating to {}", path);
        self.guard.navigate(path);
        self.sync_feed();
    }

    /// Run the notification feed only for members inside the member area
    fn sync_feed(&mut self) {
        let in_member_area = self
            .guard
            .location()
            .is_some_and(|path| path.starts_with(&self.policy.member_prefix));
        let member = self
            .controller
            .state()
            .user
            .is_some_and(|user| !user.is_admin());

        match (in_member_area && member, self.feed_task.is_some()) {
            (true, false) => self.feed_task = Some(self.feed.start()),
            (false, true) => self.feed_task = None,
            _ => {}
        }
    }

    async fn shutdown(mut self) {
        if let Some(task) = self.feed_task.take() {
            task.shutdown().await;
        }
    }

    /// Returns false when the driver should exit
    async fn handle(&mut self, line: &str) -> bool {
        let (command, argument) = line
            .trim()
            .split_once(' ')
            .map(|(c, a)| (c, a.trim()))
            .unwrap_or((line.trim(), ""));

        match command {
            "" => {}
            "goto" if !argument.is_empty() => self.navigate(argument),
            "login" => match serde_json::from_str::<LoginData>(argument) {
                Ok(data) => {
                    self.controller.login(data).await;
                    self.sync_feed();
                }
                Err(e) => warn!("Invalid login payload: {}", e),
            },
            "logout" => self.controller.request_logout(),
            "confirm" => {
                self.controller.confirm_logout().await;
                self.navigate("/");
            }
            "cancel" => self.controller.cancel_logout(),
            "profile" => {
                open_profile_page(&mut self.guard, &self.controller);
                info!("Navigated to {}", self.policy.profile_route);
            }
            "dismiss" => self.controller.dismiss_profile_prompt(),
            "notifications" => {
                for notification in self.feed.unread() {
                    info!("[{}] {}", notification.created_at, notification.message);
                }
                info!("{} unread notifications", self.feed.unread_count());
            }
            "status" => {
                let state = self.controller.state();
                info!(
                    "phase={:?} user={} location={} logout_prompt={} profile_incomplete={} completion={}",
                    state.phase(),
                    state.user.as_ref().map(|u| u.display_name()).unwrap_or("-"),
                    self.guard.location().unwrap_or("-"),
                    state.show_logout_confirmation,
                    state.profile_incomplete,
                    state
                        .last_profile_check
                        .as_ref()
                        .map(|c| format!("{}%", c.completion_percentage))
                        .unwrap_or_else(|| "-".to_string()),
                );
            }
            "quit" | "exit" => return false,
            _ => info!("{}", HELP),
        }
        true
    }
}

async fn credential_store(config: &SessionConfig) -> Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match config.credential_backend {
        CredentialBackend::File => {
            let store = FileCredentialStore::new(config.credentials_path.clone());
            info!("Using credentials file {}", store.path().display());
            Arc::new(store)
        }
        CredentialBackend::Redis => {
            let store = RedisCredentialStore::new(config.redis_config())?;
            match store.health_check().await {
                Ok(true) => info!("Redis credential store is reachable"),
                Ok(false) => warn!("Redis answered PING unexpectedly"),
                Err(e) => warn!("Redis credential store is unreachable: {}", e),
            }
            Arc::new(store)
        }
        CredentialBackend::Memory => {
            warn!("Using in-memory credentials, the session will not survive a restart");
            Arc::new(MemoryCredentialStore::new())
        }
    };
    Ok(store)
}

fn render(prompt: Prompt) {
    match prompt {
        Prompt::LogoutConfirmation => info!("{} (confirm / cancel)", prompt.text()),
        Prompt::ProfileCompletion => info!(
            "{}: {} (profile / dismiss)",
            session::prompt::PROFILE_COMPLETION_TITLE,
            prompt.text()
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting portal session service");

    let config = SessionConfig::from_env()?;
    let api = HttpPortalApi::new(&config.api_base_url, config.request_timeout())?;
    info!("Portal API at {}", api.base_url());

    let controller = Arc::new(SessionController::new(
        Arc::new(api),
        credential_store(&config).await?,
    ));
    controller.bootstrap().await;

    let policy = RoutePolicy::default();
    let mut driver = Driver {
        guard: ProfileCompletionGuard::new(
            controller.clone(),
            policy.clone(),
            config.poll_interval(),
        ),
        feed: Arc::new(NotificationFeed::new(
            controller.clone(),
            config.poll_interval(),
        )),
        feed_task: None,
        policy,
        controller: controller.clone(),
    };

    if controller.state().is_authenticated() {
        driver.navigate(&config.start_route);
    } else {
        info!("Not signed in; use `login <json>` then `goto <path>`");
    }
    info!("{}", HELP);

    let mut prompts = PromptWatcher::new(controller.subscribe());
    let mut unread = driver.feed.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            raised = prompts.next() => match raised {
                Some(raised) => raised.into_iter().for_each(render),
                None => break,
            },
            changed = unread.changed() => {
                if changed.is_err() {
                    break;
                }
                let count = unread.borrow_and_update().len();
                info!("{} unread notifications", count);
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !driver.handle(&line).await {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    // Release the pollers before the runtime goes away
    driver.shutdown().await;
    info!("Shutting down portal session service");

    Ok(())
}
