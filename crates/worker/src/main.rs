//! empress-sw entry point.
//!
//! Drives the offline worker from JSON lines on stdin and answers each line
//! with one JSON line on stdout. Logging goes to stderr to keep stdout clean.

use std::sync::Arc;

use anyhow::{Result, bail};
use empress_client::{FetchConfig, HttpNetwork, Network};
use empress_core::{ActionKind, AppConfig, CacheDb, Response};
use empress_worker::{ConsolePlatform, EventOutcome, FetchOutcome, OfflineWorker, WorkerEvent, WorkerSettings};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

/// A page-side write queued for background sync.
#[derive(Debug, Deserialize)]
struct QueueCommand {
    kind: String,
    id: String,
    #[serde(default)]
    payload: Value,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let settings = WorkerSettings::from_config(&config)?;
    let db = CacheDb::open(&config.db_path).await?;
    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(FetchConfig::from(&config))?);
    let platform = Arc::new(ConsolePlatform::new());
    let worker = OfflineWorker::new(settings, db, network.clone(), platform.clone());

    tracing::info!(
        origin = %config.origin,
        version = %config.version,
        db_path = %config.db_path.display(),
        "Starting empress-sw on stdin"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut reply = match handle_line(&worker, network.as_ref(), line).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "event failed");
                json!({ "error": e.to_string() })
            }
        };

        let effects = platform.drain_effects();
        if !effects.is_empty()
            && let Some(obj) = reply.as_object_mut()
        {
            obj.insert("effects".into(), serde_json::to_value(effects)?);
        }

        stdout.write_all(format!("{reply}\n").as_bytes()).await?;
        stdout.flush().await?;
    }

    let state = worker.state().await;
    tracing::info!(%state, "stdin closed, shutting down");
    if let Err(e) = worker.store().clone().close().await {
        tracing::warn!(error = %e, "failed to close worker store");
    }
    Ok(())
}

async fn handle_line(worker: &OfflineWorker, network: &dyn Network, line: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(line)?;

    if value.get("type").and_then(Value::as_str) == Some("queue") {
        let command: QueueCommand = serde_json::from_value(value)?;
        let kind: ActionKind = command.kind.parse()?;
        worker.store().enqueue_action(kind, &command.id, &command.payload).await?;
        let pending = worker.store().pending_count(kind).await?;
        return Ok(json!({ "outcome": "queued", "kind": kind, "id": command.id, "pending": pending }));
    }

    let event: WorkerEvent = serde_json::from_value(value)?;
    let fetched = match &event {
        WorkerEvent::Fetch { request } => Some(request.clone()),
        _ => None,
    };

    let reply = match worker.dispatch(event).await? {
        EventOutcome::Installed(report) => json!({ "outcome": "installed", "report": report }),
        EventOutcome::Activated(report) => json!({ "outcome": "activated", "report": report }),
        EventOutcome::Fetched(FetchOutcome::Respond { response, source }) => {
            json!({ "outcome": "fetched", "source": source, "response": summarize(&response) })
        }
        EventOutcome::Fetched(FetchOutcome::PassThrough) => {
            let Some(request) = fetched else {
                bail!("pass-through outcome without a fetch request");
            };
            let response = network.fetch(&request).await?;
            json!({ "outcome": "pass_through", "response": summarize(&response) })
        }
        EventOutcome::Synced(report) => json!({ "outcome": "synced", "report": report }),
        EventOutcome::Notified(notification) => json!({ "outcome": "notified", "notification": notification }),
        EventOutcome::Clicked(click) => json!({ "outcome": "clicked", "click": click }),
    };

    Ok(reply)
}

fn summarize(response: &Response) -> Value {
    json!({
        "status": response.status,
        "status_text": response.status_text,
        "content_type": response.content_type(),
        "body_bytes": response.body.len(),
    })
}
