//! Database schema migrations.
//!
//! A `_migrations` version table records which SQL batches have run.
//! Version 1 creates the cache partitions and their entries, version 2 the
//! pending offline-action queue.

use super::Error;
use tokio_rusqlite::rusqlite;
use tokio_rusqlite::{Connection, params};

/// A schema step: version, short name for logs, SQL batch.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, name: "partitions", sql: include_str!("../../migrations/001_partitions.sql") },
    Migration { version: 2, name: "pending_actions", sql: include_str!("../../migrations/002_pending_actions.sql") },
];

fn current_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?)
}

/// Apply every migration newer than the recorded version.
///
/// Each migration runs in its own transaction together with its
/// `_migrations` row, so a failing batch leaves the previous version intact.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` naming the version whose SQL failed.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    run_up_to(conn, i64::MAX).await
}

async fn run_up_to(conn: &Connection, target: i64) -> Result<(), Error> {
    conn.call(move |conn| -> Result<(), Error> {
        let current = current_version(conn)?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current && m.version <= target) {
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql).map_err(|e| {
                Error::MigrationFailed(format!("version {} ({}): {e}", migration.version, migration.name))
            })?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![migration.version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;

            tracing::debug!(version = migration.version, name = migration.name, "applied store migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
