//! Events delivered to the worker and what handling them produced.

use empress_core::Request;
use serde::{Deserialize, Serialize};

use crate::intercept::FetchOutcome;
use crate::push::{ClickOutcome, NotificationDescriptor};
use crate::sync::SyncReport;
use crate::worker::{ActivateReport, InstallReport};

/// One event from the platform.
///
/// Serialized with a `type` tag, e.g. `{"type":"sync","tag":"analytics-data"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch {
        request: Request,
    },
    Sync {
        tag: String,
    },
    Push {
        #[serde(default)]
        data: Option<String>,
    },
    NotificationClick {
        /// `None` for a click on the notification body.
        #[serde(default)]
        action: Option<String>,
        notification: NotificationDescriptor,
    },
}

impl WorkerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerEvent::Install => "install",
            WorkerEvent::Activate => "activate",
            WorkerEvent::Fetch { .. } => "fetch",
            WorkerEvent::Sync { .. } => "sync",
            WorkerEvent::Push { .. } => "push",
            WorkerEvent::NotificationClick { .. } => "notification_click",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetched(FetchOutcome),
    Synced(SyncReport),
    Notified(NotificationDescriptor),
    Clicked(ClickOutcome),
}
