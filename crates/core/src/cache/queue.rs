//! Pending offline actions.
//!
//! The page queues writes it could not send while offline (newsletter
//! subscriptions, analytics batches). The worker replays them on a background
//! sync trigger and deletes each one the server accepts. Rejected items stay
//! queued; the attempt counter is bookkeeping only and never stops a retry.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio_rusqlite::params;

/// The kind of queued write, one per background-sync tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    NewsletterSubscription,
    AnalyticsData,
}

impl ActionKind {
    pub const ALL: [ActionKind; 2] = [ActionKind::NewsletterSubscription, ActionKind::AnalyticsData];

    /// The sync tag the page registers for this kind.
    pub fn sync_tag(self) -> &'static str {
        match self {
            ActionKind::NewsletterSubscription => "newsletter-subscription",
            ActionKind::AnalyticsData => "analytics-data",
        }
    }

    /// Inverse of [`ActionKind::sync_tag`].
    pub fn from_sync_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.sync_tag() == tag)
    }

    fn as_str(self) -> &'static str {
        match self {
            ActionKind::NewsletterSubscription => "newsletter_subscription",
            ActionKind::AnalyticsData => "analytics_data",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || kind.sync_tag() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown action kind: {s}")))
    }
}

/// A queued write awaiting replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub id: String,
    pub payload: serde_json::Value,
    pub queued_at: String,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl CacheDb {
    /// Queue a write under `(kind, id)`.
    ///
    /// Re-queuing an existing id replaces its payload (last write wins) and
    /// resets its attempt bookkeeping.
    pub async fn enqueue_action(&self, kind: ActionKind, id: &str, payload: &serde_json::Value) -> Result<(), Error> {
        if id.is_empty() {
            return Err(Error::InvalidInput("action id cannot be empty".into()));
        }

        let id = id.to_string();
        let payload_json = serde_json::to_string(payload)?;
        let queued_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO pending_actions (kind, id, payload_json, queued_at, attempts, last_error)
                     VALUES (?1, ?2, ?3, ?4, 0, NULL)
                     ON CONFLICT(kind, id) DO UPDATE SET
                        payload_json = excluded.payload_json,
                        queued_at = excluded.queued_at,
                        attempts = 0,
                        last_error = NULL",
                    params![kind.as_str(), id, payload_json, queued_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// All queued actions of one kind, oldest first.
    pub async fn pending_actions(&self, kind: ActionKind) -> Result<Vec<PendingAction>, Error> {
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<(String, String, String, i64, Option<String>)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, payload_json, queued_at, attempts, last_error
                     FROM pending_actions WHERE kind = ?1 ORDER BY queued_at ASC, rowid ASC",
                )?;
                let rows = stmt
                    .query_map(params![kind.as_str()], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter()
            .map(|(id, payload_json, queued_at, attempts, last_error)| {
                Ok(PendingAction {
                    kind,
                    id,
                    payload: serde_json::from_str(&payload_json)?,
                    queued_at,
                    attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
                    last_error,
                })
            })
            .collect()
    }

    /// Delete a replayed action. Returns false if it was already gone.
    pub async fn remove_action(&self, kind: ActionKind, id: &str) -> Result<bool, Error> {
        let id = id.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted =
                    conn.execute("DELETE FROM pending_actions WHERE kind = ?1 AND id = ?2", params![kind.as_str(), id])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Record a failed replay attempt; the action stays queued.
    pub async fn record_failed_attempt(&self, kind: ActionKind, id: &str, error: &str) -> Result<(), Error> {
        let id = id.to_string();
        let error = error.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE pending_actions SET attempts = attempts + 1, last_error = ?3
                     WHERE kind = ?1 AND id = ?2",
                    params![kind.as_str(), id, error],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Number of queued actions of one kind.
    pub async fn pending_count(&self, kind: ActionKind) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM pending_actions WHERE kind = ?1",
                    params![kind.as_str()],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
