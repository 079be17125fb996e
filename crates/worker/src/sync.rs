//! Background-sync replay of writes queued while offline.
//!
//! Each sync tag maps to one [`ActionKind`]. Replay POSTs every pending
//! action of that kind to its endpoint; a 2xx removes the action, anything
//! else leaves it queued for the next sync with the failure recorded.

use empress_core::{ActionKind, PendingAction, Request};
use serde::{Deserialize, Serialize};

use crate::error::WorkerError;
use crate::worker::OfflineWorker;

/// Result of one sync event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub tag: String,
    /// Ids removed from the queue after a 2xx.
    pub replayed: Vec<String>,
    /// Ids left queued, including accepted ones whose removal failed.
    pub failed: Vec<String>,
}

impl SyncReport {
    fn empty(tag: &str) -> Self {
        Self { tag: tag.to_string(), ..Default::default() }
    }
}

impl OfflineWorker {
    pub(crate) async fn handle_sync(&self, tag: &str) -> Result<SyncReport, WorkerError> {
        let Some(kind) = ActionKind::from_sync_tag(tag) else {
            tracing::warn!(tag, "ignoring unknown sync tag");
            return Ok(SyncReport::empty(tag));
        };

        let pending = self.store().pending_actions(kind).await?;
        tracing::info!(tag, pending = pending.len(), "replaying queued actions");

        let mut report = SyncReport::empty(tag);
        for action in pending {
            match self.replay(&action).await {
                Ok(()) => match self.store().remove_action(kind, &action.id).await {
                    Ok(_) => report.replayed.push(action.id),
                    Err(e) => {
                        tracing::warn!(tag, id = %action.id, error = %e, "replay accepted but action could not be removed");
                        report.failed.push(action.id);
                    }
                },
                Err(reason) => {
                    tracing::warn!(tag, id = %action.id, attempts = action.attempts + 1, %reason, "replay failed; keeping action");
                    if let Err(e) = self.store().record_failed_attempt(kind, &action.id, &reason).await {
                        tracing::warn!(id = %action.id, error = %e, "failed to record replay attempt");
                    }
                    report.failed.push(action.id);
                }
            }
        }

        tracing::info!(tag, replayed = report.replayed.len(), failed = report.failed.len(), "sync complete");
        Ok(report)
    }

    /// POST one action; `Err` carries the reason it stays queued.
    async fn replay(&self, action: &PendingAction) -> Result<(), String> {
        let endpoint = self.settings().replay_endpoint(action.kind).clone();
        let request = Request::post_json(endpoint, &action.payload);

        match self.fetch_bounded(&request).await {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => Err(format!("status {}", response.status)),
            Err(e) => Err(e.to_string()),
        }
    }
}
