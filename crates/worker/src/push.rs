//! Push messages and notification clicks.
//!
//! A push message becomes exactly one system notification. Its optional JSON
//! payload may override title, body and target URL; anything unparseable is
//! logged and the configured defaults are used instead.

use chrono::{DateTime, Utc};
use empress_client::same_origin;
use empress_core::NotificationConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::WorkerError;
use crate::worker::OfflineWorker;

/// Optional fields a push payload may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl PushPayload {
    /// Parse raw push data; absent, blank or malformed data yields no overrides.
    pub fn parse(data: Option<&str>) -> Self {
        let Some(raw) = data.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Self::default();
        };

        match serde_json::from_str::<PushPayload>(raw) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "push payload is not valid JSON; using default notification");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

/// Data attached to a notification and handed back on click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub url: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub date_of_arrival: i64,
    #[serde(default = "default_primary_key")]
    pub primary_key: u32,
}

fn default_primary_key() -> u32 {
    1
}

/// Everything needed to display one system notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDescriptor {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

fn pick(value: Option<&String>, default: &str) -> String {
    value.filter(|v| !v.trim().is_empty()).map_or_else(|| default.to_string(), |v| v.clone())
}

impl NotificationDescriptor {
    /// Merge a payload over the configured defaults.
    pub fn build(payload: &PushPayload, defaults: &NotificationConfig, now: DateTime<Utc>) -> Self {
        Self {
            title: pick(payload.title.as_ref(), &defaults.title),
            body: pick(payload.body.as_ref(), &defaults.body),
            icon: defaults.icon.clone(),
            badge: defaults.badge.clone(),
            vibrate: defaults.vibrate.clone(),
            data: NotificationData {
                url: pick(payload.url.as_ref(), &defaults.url),
                date_of_arrival: now.timestamp_millis(),
                primary_key: default_primary_key(),
            },
            actions: vec![
                NotificationAction {
                    action: "explore".into(),
                    title: "Explore".into(),
                    icon: "/assets/icons/explore-action.png".into(),
                },
                NotificationAction {
                    action: "close".into(),
                    title: "Close".into(),
                    icon: "/assets/icons/close-action.png".into(),
                },
            ],
        }
    }
}

/// What the user clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    Explore,
    Close,
    /// The notification body, or an action this worker does not define.
    Body,
}

impl ClickAction {
    pub fn parse(action: Option<&str>) -> Self {
        match action {
            Some("explore") => ClickAction::Explore,
            Some("close") => ClickAction::Close,
            _ => ClickAction::Body,
        }
    }
}

/// Result of handling a notification click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// Notification closed, nothing else done.
    Closed,
    Opened { url: String },
    Focused { client_id: String },
}

impl OfflineWorker {
    /// Show a notification for a push message.
    pub(crate) async fn handle_push(&self, data: Option<&str>) -> Result<NotificationDescriptor, WorkerError> {
        let payload = PushPayload::parse(data);
        let notification = NotificationDescriptor::build(&payload, &self.settings().notification, Utc::now());

        tracing::info!(title = %notification.title, url = %notification.data.url, "showing push notification");
        self.platform().show_notification(&notification).await?;

        Ok(notification)
    }

    /// Close the notification, then route by the chosen action.
    pub(crate) async fn handle_notification_click(
        &self, action: Option<&str>, notification: &NotificationDescriptor,
    ) -> Result<ClickOutcome, WorkerError> {
        if let Err(e) = self.platform().close_notification(notification).await {
            tracing::warn!(error = %e, "failed to close notification");
        }

        let platform = self.platform();
        match ClickAction::parse(action) {
            ClickAction::Explore => {
                let url = pick(Some(&notification.data.url), "/");
                platform.open_window(&url).await?;
                Ok(ClickOutcome::Opened { url })
            }
            ClickAction::Close => Ok(ClickOutcome::Closed),
            ClickAction::Body => {
                let origin = &self.settings().origin;
                let existing = platform
                    .window_clients()
                    .await?
                    .into_iter()
                    .find(|client| Url::parse(&client.url).is_ok_and(|url| same_origin(&url, origin)));

                match existing {
                    Some(client) => {
                        platform.focus_client(&client.id).await?;
                        Ok(ClickOutcome::Focused { client_id: client.id })
                    }
                    None => {
                        platform.open_window("/").await?;
                        Ok(ClickOutcome::Opened { url: "/".into() })
                    }
                }
            }
        }
    }
}
