//! Test doubles shared by the worker's unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use empress_client::{Network, NetworkError};
use empress_core::{AppConfig, CacheDb, Request, Response};
use url::Url;

use crate::platform::ConsolePlatform;
use crate::settings::WorkerSettings;
use crate::worker::OfflineWorker;

#[derive(Debug, Clone)]
enum Route {
    Respond(Response),
    /// One response per call, in order; the last one repeats.
    InTurn(VecDeque<Response>),
    Fail,
    Hang,
}

/// Scripted network keyed by URL path. Unscripted paths answer 404.
#[derive(Debug, Default)]
pub(crate) struct FakeNetwork {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<Request>>,
    calls: AtomicUsize,
    closing: Mutex<Option<CacheDb>>,
}

impl FakeNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every default manifest path and API endpoint answers 200.
    pub(crate) fn serving_site() -> Arc<Self> {
        let network = Self::new();
        let config = AppConfig::default();
        for path in config.static_manifest.iter().chain(config.api_endpoints.iter()) {
            network.respond(path, Response::ok(content_type_for(path), format!("body of {path}")));
        }
        network
    }

    pub(crate) fn respond(&self, path: &str, response: Response) {
        self.routes.lock().unwrap().insert(path.to_string(), Route::Respond(response));
    }

    pub(crate) fn respond_in_turn(&self, path: &str, responses: Vec<Response>) {
        self.routes.lock().unwrap().insert(path.to_string(), Route::InTurn(responses.into()));
    }

    /// Requests to `path` fail with no response.
    pub(crate) fn fail(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), Route::Fail);
    }

    /// Requests to `path` never complete.
    pub(crate) fn hang(&self, path: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), Route::Hang);
    }

    /// Take the whole network down.
    pub(crate) fn go_offline(&self) {
        let mut routes = self.routes.lock().unwrap();
        for route in routes.values_mut() {
            *route = Route::Fail;
        }
        routes.insert("*".into(), Route::Fail);
    }

    /// Close `store` while the next request is in flight, before it answers.
    pub(crate) fn close_store_on_next_fetch(&self, store: CacheDb) {
        *self.closing.lock().unwrap() = Some(store);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("png") => "image/png",
        Some("json") => "application/json",
        _ => "text/html",
    }
}

#[async_trait::async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let closing = self.closing.lock().unwrap().take();
        if let Some(store) = closing {
            store.close().await.unwrap();
        }

        let route = {
            let mut routes = self.routes.lock().unwrap();
            let key = if routes.contains_key(request.url.path()) { request.url.path() } else { "*" };
            match routes.get_mut(key) {
                Some(Route::InTurn(queue)) if queue.len() > 1 => queue.pop_front().map(Route::Respond),
                Some(Route::InTurn(queue)) => queue.front().cloned().map(Route::Respond),
                other => other.cloned(),
            }
        };
        match route {
            Some(Route::Respond(response)) => Ok(response),
            Some(Route::Fail) => Err(NetworkError::Offline(format!("no route to {}", request.url))),
            Some(Route::Hang) => std::future::pending().await,
            Some(Route::InTurn(_)) | None => Ok(Response::new(404, "Not Found", "")),
        }
    }
}

/// Absolute URL on the default site origin.
pub(crate) fn origin_url(path: &str) -> Url {
    Url::parse("http://localhost:8080").unwrap().join(path).unwrap()
}

/// A fresh worker over an in-memory store with default settings.
pub(crate) async fn worker_with(network: Arc<FakeNetwork>) -> (OfflineWorker, Arc<ConsolePlatform>) {
    worker_with_config(network, &AppConfig::default()).await
}

pub(crate) async fn worker_with_config(
    network: Arc<FakeNetwork>, config: &AppConfig,
) -> (OfflineWorker, Arc<ConsolePlatform>) {
    let settings = WorkerSettings::from_config(config).unwrap();
    let db = CacheDb::open_in_memory().await.unwrap();
    let platform = Arc::new(ConsolePlatform::new());
    let worker = OfflineWorker::new(settings, db, network, platform.clone());
    (worker, platform)
}

/// An installed and activated worker. Network calls and platform effects
/// made during startup are cleared.
pub(crate) async fn running_worker(network: Arc<FakeNetwork>) -> (OfflineWorker, Arc<ConsolePlatform>) {
    let (worker, platform) = worker_with(network.clone()).await;
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    platform.drain_effects();
    network.calls.store(0, Ordering::SeqCst);
    network.requests.lock().unwrap().clear();
    (worker, platform)
}
