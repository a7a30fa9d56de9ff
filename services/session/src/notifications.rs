//! Unread notification feed
//!
//! The portal has no push channel, so the member's notification list is
//! polled. Only unread entries are kept; a failed fetch keeps the last list.
//! Administrators have no feed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::controller::SessionController;
use crate::scope::ScopedTask;

/// A notification addressed to the member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// The portal sends either a number or a string
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(id) => id,
        Id::Number(id) => id.to_string(),
    })
}

/// Polls the notification endpoint and publishes the unread entries
pub struct NotificationFeed {
    controller: Arc<SessionController>,
    unread: watch::Sender<Vec<Notification>>,
    interval: Duration,
}

impl NotificationFeed {
    pub fn new(controller: Arc<SessionController>, interval: Duration) -> Self {
        let (unread, _) = watch::channel(Vec::new());
        Self {
            controller,
            unread,
            interval,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.unread.subscribe()
    }

    pub fn unread(&self) -> Vec<Notification> {
        self.unread.borrow().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.unread.borrow().len()
    }

    /// Fetch once; returns the unread count after the fetch
    ///
    /// Nothing is fetched while signed out or signed in as an administrator.
    pub async fn refresh(&self) -> usize {
        let eligible = self
            .controller
            .state()
            .user
            .is_some_and(|user| !user.is_admin());
        if !eligible {
            return self.unread_count();
        }
        let Some(access_token) = self.controller.access_token().await else {
            return self.unread_count();
        };

        match self.controller.api().notifications(&access_token).await {
            Ok(all) => {
                let unread: Vec<Notification> = all.into_iter().filter(|n| !n.is_read).collect();
                debug!("{} unread notifications", unread.len());
                let count = unread.len();
                self.unread.send_if_modified(|current| {
                    let changed = *current != unread;
                    *current = unread;
                    changed
                });
                count
            }
            Err(e) => {
                error!("Error fetching notifications: {}", e);
                self.unread_count()
            }
        }
    }

    /// Poll immediately and then on every interval until the task is dropped
    pub fn start(self: &Arc<Self>) -> ScopedTask {
        let feed = self.clone();
        ScopedTask::spawn(move |cancel| async move {
            let mut ticker = tokio::time::interval(feed.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = feed.refresh() => {}
                        }
                    }
                }
            }
        })
    }
}
