//! Worker lifecycle state machine.
//!
//! ```text
//! Parsed ──install──▶ Installing ──ok──▶ Installed ──activate──▶ Activating ──ok──▶ Activated
//!                         │                  │                        │
//!                         └──fail──▶ Redundant ◀──superseded          └──fail──▶ Installed
//! ```
//!
//! Only an `Activated` worker handles fetch, sync, push and notification
//! clicks. `Redundant` is terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WorkerError;

/// Lifecycle state of one worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Registered; no lifecycle event delivered yet.
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    /// Controlling pages and handling functional events.
    Activated,
    /// Install failed or a newer version replaced this one.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Current state plus the platform signals sent so far.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: WorkerState,
    changed_at: DateTime<Utc>,
    skipped_waiting: bool,
    claimed: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self { state: WorkerState::Parsed, changed_at: Utc::now(), skipped_waiting: false, claimed: false }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn changed_at(&self) -> DateTime<Utc> {
        self.changed_at
    }

    pub fn skipped_waiting(&self) -> bool {
        self.skipped_waiting
    }

    pub fn claimed(&self) -> bool {
        self.claimed
    }

    fn transition(&mut self, from: WorkerState, to: WorkerState, event: &'static str) -> Result<(), WorkerError> {
        if self.state != from {
            return Err(WorkerError::InvalidTransition { state: self.state, event });
        }
        self.set(to);
        Ok(())
    }

    fn set(&mut self, to: WorkerState) {
        tracing::info!(from = %self.state, to = %to, "worker state change");
        self.state = to;
        self.changed_at = Utc::now();
    }

    pub fn begin_install(&mut self) -> Result<(), WorkerError> {
        self.transition(WorkerState::Parsed, WorkerState::Installing, "install")
    }

    /// Settle an install: `Installed` on success, `Redundant` on failure.
    pub fn finish_install(&mut self, succeeded: bool) -> Result<(), WorkerError> {
        let to = if succeeded { WorkerState::Installed } else { WorkerState::Redundant };
        self.transition(WorkerState::Installing, to, "install")?;
        self.skipped_waiting = succeeded;
        Ok(())
    }

    pub fn begin_activate(&mut self) -> Result<(), WorkerError> {
        self.transition(WorkerState::Installed, WorkerState::Activating, "activate")
    }

    /// Settle an activation. A failed one returns to `Installed` so it can be retried.
    pub fn finish_activate(&mut self, succeeded: bool) -> Result<(), WorkerError> {
        let to = if succeeded { WorkerState::Activated } else { WorkerState::Installed };
        self.transition(WorkerState::Activating, to, "activate")?;
        self.claimed = succeeded;
        Ok(())
    }

    /// A newer version took over before this one activated.
    pub fn supersede(&mut self) -> Result<(), WorkerError> {
        match self.state {
            WorkerState::Parsed | WorkerState::Installing | WorkerState::Installed => {
                self.set(WorkerState::Redundant);
                Ok(())
            }
            state => Err(WorkerError::InvalidTransition { state, event: "supersede" }),
        }
    }

    /// Guard for functional events.
    pub fn ensure_running(&self, event: &'static str) -> Result<(), WorkerError> {
        if self.state == WorkerState::Activated {
            Ok(())
        } else {
            Err(WorkerError::InvalidTransition { state: self.state, event })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut lc = Lifecycle::new();
        assert_eq!(lc.state(), WorkerState::Parsed);

        lc.begin_install().unwrap();
        assert_eq!(lc.state(), WorkerState::Installing);
        lc.finish_install(true).unwrap();
        assert_eq!(lc.state(), WorkerState::Installed);
        assert!(lc.skipped_waiting());

        lc.begin_activate().unwrap();
        lc.finish_activate(true).unwrap();
        assert_eq!(lc.state(), WorkerState::Activated);
        assert!(lc.claimed());
        assert!(lc.ensure_running("fetch").is_ok());
    }

    #[test]
    fn test_failed_install_is_terminal() {
        let mut lc = Lifecycle::new();
        lc.begin_install().unwrap();
        lc.finish_install(false).unwrap();
        assert_eq!(lc.state(), WorkerState::Redundant);
        assert!(!lc.skipped_waiting());

        assert!(lc.begin_activate().is_err());
        assert!(lc.begin_install().is_err());
        assert!(lc.ensure_running("fetch").is_err());
    }

    #[test]
    fn test_failed_activate_can_retry() {
        let mut lc = Lifecycle::new();
        lc.begin_install().unwrap();
        lc.finish_install(true).unwrap();
        lc.begin_activate().unwrap();
        lc.finish_activate(false).unwrap();
        assert_eq!(lc.state(), WorkerState::Installed);
        assert!(!lc.claimed());

        lc.begin_activate().unwrap();
        lc.finish_activate(true).unwrap();
        assert_eq!(lc.state(), WorkerState::Activated);
    }

    #[test]
    fn test_activate_before_install_rejected() {
        let mut lc = Lifecycle::new();
        let err = lc.begin_activate().unwrap_err();
        assert!(matches!(err, WorkerError::InvalidTransition { state: WorkerState::Parsed, event: "activate" }));
    }

    #[test]
    fn test_functional_events_wait_for_activation() {
        let mut lc = Lifecycle::new();
        lc.begin_install().unwrap();
        assert!(matches!(
            lc.ensure_running("sync"),
            Err(WorkerError::InvalidTransition { state: WorkerState::Installing, event: "sync" })
        ));
    }

    #[test]
    fn test_supersede() {
        let mut lc = Lifecycle::new();
        lc.begin_install().unwrap();
        lc.finish_install(true).unwrap();
        lc.supersede().unwrap();
        assert_eq!(lc.state(), WorkerState::Redundant);

        assert!(lc.supersede().is_err());
    }
}
