//! The offline worker: owns the store, the network seam, the platform and
//! the lifecycle state, and routes every event through [`OfflineWorker::dispatch`].

use std::sync::Arc;

use empress_client::{Network, NetworkError, resolve};
use empress_core::{CacheDb, Request, Response};
use futures_util::future::{join_all, try_join, try_join_all};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::WorkerError;
use crate::event::{EventOutcome, WorkerEvent};
use crate::lifecycle::{Lifecycle, WorkerState};
use crate::platform::Platform;
use crate::settings::WorkerSettings;

/// What install pre-cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    pub static_entries: usize,
    pub dynamic_entries: usize,
}

/// What activation cleaned up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateReport {
    /// Stale partitions removed, in name order.
    pub deleted: Vec<String>,
}

pub struct OfflineWorker {
    settings: WorkerSettings,
    db: CacheDb,
    network: Arc<dyn Network>,
    platform: Arc<dyn Platform>,
    lifecycle: Mutex<Lifecycle>,
}

impl OfflineWorker {
    pub fn new(settings: WorkerSettings, db: CacheDb, network: Arc<dyn Network>, platform: Arc<dyn Platform>) -> Self {
        Self { settings, db, network, platform, lifecycle: Mutex::new(Lifecycle::new()) }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// The backing store, shared with the page side for queueing writes.
    pub fn store(&self) -> &CacheDb {
        &self.db
    }

    pub(crate) fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.lock().await.state()
    }

    /// Mark this version replaced by a newer one.
    pub async fn supersede(&self) -> Result<(), WorkerError> {
        self.lifecycle.lock().await.supersede()
    }

    /// Handle one event, awaiting all of its work before returning.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, WorkerError> {
        let name = event.name();
        tracing::debug!(event = name, "dispatching event");

        match event {
            WorkerEvent::Install => self.install().await.map(EventOutcome::Installed),
            WorkerEvent::Activate => self.activate().await.map(EventOutcome::Activated),
            WorkerEvent::Fetch { request } => {
                self.ensure_running(name).await?;
                Ok(EventOutcome::Fetched(self.handle_fetch(&request).await))
            }
            WorkerEvent::Sync { tag } => {
                self.ensure_running(name).await?;
                self.handle_sync(&tag).await.map(EventOutcome::Synced)
            }
            WorkerEvent::Push { data } => {
                self.ensure_running(name).await?;
                self.handle_push(data.as_deref()).await.map(EventOutcome::Notified)
            }
            WorkerEvent::NotificationClick { action, notification } => {
                self.ensure_running(name).await?;
                self.handle_notification_click(action.as_deref(), &notification)
                    .await
                    .map(EventOutcome::Clicked)
            }
        }
    }

    async fn ensure_running(&self, event: &'static str) -> Result<(), WorkerError> {
        self.lifecycle.lock().await.ensure_running(event)
    }

    /// Pre-cache the static manifest and API endpoints.
    ///
    /// Every URL must come back 2xx. Either both partitions are written in
    /// full or nothing is, and a failure leaves this version redundant.
    pub async fn install(&self) -> Result<InstallReport, WorkerError> {
        self.lifecycle.lock().await.begin_install()?;

        match self.precache().await {
            Ok(report) => {
                self.lifecycle.lock().await.finish_install(true)?;
                tracing::info!(
                    static_entries = report.static_entries,
                    dynamic_entries = report.dynamic_entries,
                    "install complete"
                );
                if let Err(e) = self.platform.skip_waiting().await {
                    tracing::warn!(error = %e, "skip waiting failed");
                }
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "install failed");
                self.lifecycle.lock().await.finish_install(false)?;
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<InstallReport, WorkerError> {
        let (statics, dynamics) = try_join(
            self.fetch_all(&self.settings.static_manifest),
            self.fetch_all(&self.settings.api_endpoints),
        )
        .await?;

        let report = InstallReport { static_entries: statics.len(), dynamic_entries: dynamics.len() };
        self.db
            .populate_partitions(vec![
                (self.settings.static_cache.clone(), statics),
                (self.settings.dynamic_cache.clone(), dynamics),
            ])
            .await
            .map_err(|e| WorkerError::InstallFailed(format!("writing partitions: {e}")))?;

        Ok(report)
    }

    async fn fetch_all(&self, paths: &[String]) -> Result<Vec<(Request, Response)>, WorkerError> {
        let fetches = paths.iter().map(|path| async move {
            let url = resolve(&self.settings.origin, path)
                .map_err(|e| WorkerError::InstallFailed(format!("{path}: {e}")))?;
            let request = Request::get(url);
            let response = self
                .fetch_bounded(&request)
                .await
                .map_err(|e| WorkerError::InstallFailed(format!("{path}: {e}")))?;
            if !response.is_success() {
                return Err(WorkerError::InstallFailed(format!("{path} returned status {}", response.status)));
            }
            Ok::<_, WorkerError>((request, response))
        });

        try_join_all(fetches).await
    }

    /// Drop every partition that is not one of the two current ones, then
    /// take control of open pages.
    pub async fn activate(&self) -> Result<ActivateReport, WorkerError> {
        self.lifecycle.lock().await.begin_activate()?;

        match self.delete_stale_partitions().await {
            Ok(deleted) => {
                self.lifecycle.lock().await.finish_activate(true)?;
                tracing::info!(deleted = deleted.len(), "activation complete");
                if let Err(e) = self.platform.claim_clients().await {
                    tracing::warn!(error = %e, "claiming clients failed");
                }
                Ok(ActivateReport { deleted })
            }
            Err(e) => {
                tracing::error!(error = %e, "activation failed");
                self.lifecycle.lock().await.finish_activate(false)?;
                Err(e)
            }
        }
    }

    async fn delete_stale_partitions(&self) -> Result<Vec<String>, WorkerError> {
        let current = self.settings.partitions();
        let stale: Vec<String> =
            self.db.partition_names().await?.into_iter().filter(|name| !current.contains(name)).collect();

        let results = join_all(stale.iter().map(|name| self.db.delete_partition(name))).await;

        let mut deleted = Vec::with_capacity(stale.len());
        for (name, result) in stale.into_iter().zip(results) {
            if result? {
                tracing::info!(partition = %name, "deleted stale partition");
                deleted.push(name);
            }
        }
        deleted.sort();
        Ok(deleted)
    }

    /// Network fetch bounded by the configured wait. Elapsing counts as a
    /// transport failure.
    pub(crate) async fn fetch_bounded(&self, request: &Request) -> Result<Response, NetworkError> {
        match tokio::time::timeout(self.settings.timeout, self.network.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(NetworkError::Timeout(self.settings.timeout.as_millis() as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ConsolePlatform, PlatformEffect};
    use crate::push::ClickOutcome;
    use crate::testing::{FakeNetwork, origin_url, worker_with};
    use empress_core::AppConfig;

    #[tokio::test]
    async fn test_install_populates_both_partitions() {
        let network = FakeNetwork::serving_site();
        let (worker, platform) = worker_with(network.clone()).await;

        let report = worker.install().await.unwrap();
        assert_eq!(report.static_entries, worker.settings().static_manifest.len());
        assert_eq!(report.dynamic_entries, worker.settings().api_endpoints.len());
        assert_eq!(worker.state().await, WorkerState::Installed);
        assert!(platform.drain_effects().contains(&PlatformEffect::SkipWaiting));

        let settings = worker.settings();
        for path in settings.static_manifest.iter() {
            let request = Request::get(origin_url(path));
            assert!(worker.store().match_entry(&settings.static_cache, &request).await.unwrap().is_some(), "{path}");
        }
        for path in settings.api_endpoints.iter() {
            let request = Request::get(origin_url(path));
            assert!(worker.store().match_entry(&settings.dynamic_cache, &request).await.unwrap().is_some(), "{path}");
        }
    }

    #[tokio::test]
    async fn test_failed_precache_leaves_nothing() {
        let network = FakeNetwork::serving_site();
        network.respond("/data/events.json", Response::new(404, "Not Found", ""));
        let (worker, platform) = worker_with(network).await;

        let err = worker.install().await.unwrap_err();
        assert!(matches!(err, WorkerError::InstallFailed(msg) if msg.contains("/data/events.json")));
        assert_eq!(worker.state().await, WorkerState::Redundant);
        assert!(worker.store().partition_names().await.unwrap().is_empty());
        assert!(!platform.drain_effects().contains(&PlatformEffect::SkipWaiting));

        assert!(matches!(worker.activate().await, Err(WorkerError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_offline_install_fails() {
        let network = FakeNetwork::serving_site();
        network.fail("/assets/css/main.css");
        let (worker, _) = worker_with(network).await;

        let err = worker.install().await.unwrap_err();
        assert!(matches!(err, WorkerError::InstallFailed(msg) if msg.contains("/assets/css/main.css")));
        assert_eq!(worker.state().await, WorkerState::Redundant);
        assert!(worker.store().partition_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_leaves_previous_version_serving() {
        let network = FakeNetwork::serving_site();
        let (worker, _) = worker_with(network).await;
        let previous = "pageant-empress-static-v0";
        let index = Request::get(origin_url("/index.html"));
        worker.store().open_partition(previous).await.unwrap();
        worker.store().put_entry(previous, &[], &index, &Response::ok("text/html", "<h1>v0</h1>")).await.unwrap();

        worker.install().await.unwrap();
        assert_eq!(worker.state().await, WorkerState::Installed);
        assert_eq!(worker.store().entry_count(previous).await.unwrap(), 1);
        let served = worker.store().match_entry(previous, &index).await.unwrap().unwrap();
        assert_eq!(&served.body[..], b"<h1>v0</h1>");

        worker.activate().await.unwrap();
        assert!(!worker.store().has_partition(previous).await.unwrap());
    }

    #[tokio::test]
    async fn test_activate_removes_stale_partitions() {
        let network = FakeNetwork::serving_site();
        let (worker, platform) = worker_with(network).await;
        worker.store().open_partition("pageant-empress-static-v0").await.unwrap();
        worker.store().open_partition("pageant-empress-dynamic-v0").await.unwrap();
        worker.store().open_partition("unrelated").await.unwrap();

        worker.install().await.unwrap();
        let report = worker.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["pageant-empress-dynamic-v0", "pageant-empress-static-v0", "unrelated"]);
        let mut names = worker.store().partition_names().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["pageant-empress-dynamic-v1", "pageant-empress-static-v1"]);
        assert_eq!(worker.state().await, WorkerState::Activated);
        assert!(platform.drain_effects().contains(&PlatformEffect::ClaimClients));
    }

    #[tokio::test]
    async fn test_functional_events_rejected_before_activation() {
        let (worker, _) = worker_with(FakeNetwork::serving_site()).await;

        let err = worker.dispatch(WorkerEvent::Sync { tag: "analytics-data".into() }).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidTransition { state: WorkerState::Parsed, event: "sync" }));

        worker.dispatch(WorkerEvent::Install).await.unwrap();
        let err = worker
            .dispatch(WorkerEvent::Fetch { request: Request::get(origin_url("/")) })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::InvalidTransition { state: WorkerState::Installed, event: "fetch" }));
    }

    #[tokio::test]
    async fn test_second_install_rejected() {
        let (worker, _) = worker_with(FakeNetwork::serving_site()).await;
        worker.install().await.unwrap();
        assert!(matches!(worker.install().await, Err(WorkerError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_supersede_before_activation() {
        let (worker, _) = worker_with(FakeNetwork::serving_site()).await;
        worker.install().await.unwrap();
        worker.supersede().await.unwrap();
        assert_eq!(worker.state().await, WorkerState::Redundant);
    }

    #[tokio::test]
    async fn test_fetch_bounded_times_out() {
        let network = FakeNetwork::serving_site();
        network.hang("/slow");
        let config = AppConfig { timeout_ms: 100, ..Default::default() };
        let settings = WorkerSettings::from_config(&config).unwrap();
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = OfflineWorker::new(settings, db, network, Arc::new(ConsolePlatform::new()));

        let err = worker.fetch_bounded(&Request::get(origin_url("/slow"))).await.unwrap_err();
        assert!(matches!(err, NetworkError::Timeout(100)));
        assert!(err.is_offline());
    }

    #[tokio::test]
    async fn test_dispatch_full_session() {
        let network = FakeNetwork::serving_site();
        let (worker, _) = worker_with(network.clone()).await;

        assert!(matches!(worker.dispatch(WorkerEvent::Install).await.unwrap(), EventOutcome::Installed(_)));
        assert!(matches!(worker.dispatch(WorkerEvent::Activate).await.unwrap(), EventOutcome::Activated(_)));
        let calls = network.calls();

        let fetched = worker.dispatch(WorkerEvent::Fetch { request: Request::get(origin_url("/")) }).await.unwrap();
        let EventOutcome::Fetched(outcome) = fetched else { panic!("expected fetch outcome") };
        assert_eq!(&outcome.response().unwrap().body[..], b"body of /");
        assert_eq!(network.calls(), calls);

        let synced = worker.dispatch(WorkerEvent::Sync { tag: "analytics-data".into() }).await.unwrap();
        assert!(matches!(synced, EventOutcome::Synced(report) if report.replayed.is_empty()));

        let EventOutcome::Notified(notification) =
            worker.dispatch(WorkerEvent::Push { data: Some(r#"{"url":"/x"}"#.into()) }).await.unwrap()
        else {
            panic!("expected notification");
        };
        let clicked = worker
            .dispatch(WorkerEvent::NotificationClick { action: Some("explore".into()), notification })
            .await
            .unwrap();
        assert!(matches!(clicked, EventOutcome::Clicked(ClickOutcome::Opened { url }) if url == "/x"));
    }
}
