//! Structured errors for the offline worker.

use crate::lifecycle::WorkerState;

/// Failure reported by the hosting platform (clients, notifications).
#[derive(Debug, Clone, thiserror::Error)]
#[error("platform error: {0}")]
pub struct PlatformError(pub String);

/// Errors surfaced by [`crate::OfflineWorker::dispatch`].
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The event is not valid in the worker's current lifecycle state.
    #[error("INVALID_TRANSITION: {event} not allowed while {state}")]
    InvalidTransition { state: WorkerState, event: &'static str },

    /// Pre-caching failed; this worker version is redundant.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// Store or network failure that could not be recovered locally.
    #[error(transparent)]
    Core(#[from] empress_core::Error),

    /// The platform rejected a request (opening a window, showing a notification).
    #[error(transparent)]
    Platform(#[from] PlatformError),
}
