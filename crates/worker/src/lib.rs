//! Offline caching worker for the Pageant Empress site.
//!
//! The worker pre-caches the site on install, drops stale cache versions on
//! activate, then answers same-origin GETs cache-first with offline
//! fallbacks. It also replays writes queued while offline on background
//! sync, and shows push notifications and routes their clicks.
//!
//! Everything enters through [`OfflineWorker::dispatch`].

pub mod classify;
pub mod error;
pub mod event;
pub mod fallback;
pub mod intercept;
pub mod lifecycle;
pub mod platform;
pub mod push;
pub mod settings;
pub mod sync;
pub mod worker;

#[cfg(test)]
mod testing;

pub use classify::{RequestClass, classify};
pub use error::{PlatformError, WorkerError};
pub use event::{EventOutcome, WorkerEvent};
pub use fallback::FallbackKind;
pub use intercept::{FetchOutcome, ResponseSource};
pub use lifecycle::{Lifecycle, WorkerState};
pub use platform::{ConsolePlatform, Platform, PlatformEffect, WindowClient};
pub use push::{ClickAction, ClickOutcome, NotificationAction, NotificationData, NotificationDescriptor, PushPayload};
pub use settings::WorkerSettings;
pub use sync::SyncReport;
pub use worker::{ActivateReport, InstallReport, OfflineWorker};
