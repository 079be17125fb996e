//! The hosting platform as seen from the worker.
//!
//! Window clients, system notifications, and the skip-waiting / claim
//! signals belong to whatever hosts the worker. The worker only talks to
//! them through [`Platform`].

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::PlatformError;
use crate::push::NotificationDescriptor;

/// An open page window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub focused: bool,
}

/// Platform services used by lifecycle, push and click handling.
#[async_trait::async_trait]
pub trait Platform: Send + Sync {
    /// Replace any waiting worker immediately.
    async fn skip_waiting(&self) -> Result<(), PlatformError>;

    /// Take control of every open page without waiting for navigation.
    async fn claim_clients(&self) -> Result<(), PlatformError>;

    async fn show_notification(&self, notification: &NotificationDescriptor) -> Result<(), PlatformError>;

    async fn close_notification(&self, notification: &NotificationDescriptor) -> Result<(), PlatformError>;

    /// All page windows, controlled or not.
    async fn window_clients(&self) -> Result<Vec<WindowClient>, PlatformError>;

    async fn focus_client(&self, id: &str) -> Result<(), PlatformError>;

    /// Open `url` in a new or existing window and return the window.
    async fn open_window(&self, url: &str) -> Result<WindowClient, PlatformError>;
}

/// Side effect recorded by [`ConsolePlatform`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum PlatformEffect {
    SkipWaiting,
    ClaimClients,
    ShowNotification { title: String, body: String },
    CloseNotification { title: String },
    FocusClient { id: String },
    OpenWindow { url: String },
}

#[derive(Debug, Default)]
struct ConsoleState {
    windows: Vec<WindowClient>,
    effects: Vec<PlatformEffect>,
    next_window: u64,
}

/// Headless platform for the command-line driver.
///
/// Windows are tracked in memory, every effect is logged and kept until
/// [`ConsolePlatform::drain_effects`] collects it.
#[derive(Debug, Default)]
pub struct ConsolePlatform {
    state: Mutex<ConsoleState>,
}

impl ConsolePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-open window.
    pub fn add_window(&self, url: &str) -> WindowClient {
        let mut state = self.lock();
        state.next_window += 1;
        let client = WindowClient { id: format!("window-{}", state.next_window), url: url.to_string(), focused: false };
        state.windows.push(client.clone());
        client
    }

    /// Take every effect recorded since the last call.
    pub fn drain_effects(&self) -> Vec<PlatformEffect> {
        std::mem::take(&mut self.lock().effects)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, effect: PlatformEffect) {
        tracing::info!(?effect, "platform effect");
        self.lock().effects.push(effect);
    }
}

#[async_trait::async_trait]
impl Platform for ConsolePlatform {
    async fn skip_waiting(&self) -> Result<(), PlatformError> {
        self.record(PlatformEffect::SkipWaiting);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), PlatformError> {
        self.record(PlatformEffect::ClaimClients);
        Ok(())
    }

    async fn show_notification(&self, notification: &NotificationDescriptor) -> Result<(), PlatformError> {
        self.record(PlatformEffect::ShowNotification {
            title: notification.title.clone(),
            body: notification.body.clone(),
        });
        Ok(())
    }

    async fn close_notification(&self, notification: &NotificationDescriptor) -> Result<(), PlatformError> {
        self.record(PlatformEffect::CloseNotification { title: notification.title.clone() });
        Ok(())
    }

    async fn window_clients(&self) -> Result<Vec<WindowClient>, PlatformError> {
        Ok(self.lock().windows.clone())
    }

    async fn focus_client(&self, id: &str) -> Result<(), PlatformError> {
        {
            let mut state = self.lock();
            let mut found = false;
            for window in &mut state.windows {
                window.focused = window.id == id;
                found |= window.focused;
            }
            if !found {
                return Err(PlatformError(format!("no window with id {id}")));
            }
        }
        self.record(PlatformEffect::FocusClient { id: id.to_string() });
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<WindowClient, PlatformError> {
        let client = self.add_window(url);
        self.record(PlatformEffect::OpenWindow { url: url.to_string() });
        Ok(client)
    }
}
