//! Fetch interception: cache-first with network fallback.
//!
//! ### Policy
//! - Non-GET and cross-origin requests pass through untouched.
//! - A hit in either current partition is returned as stored, with no
//!   network call and no revalidation.
//! - A miss goes to the network. A 200 is copied into the partition its URL
//!   classifies into; other statuses are returned uncached.
//! - If the network gives no answer, the offline fallbacks take over.
//!
//! Nothing in here fails the request: store errors are logged, network
//! errors become fallbacks.

use empress_client::same_origin;
use empress_core::{Request, Response};
use serde::{Deserialize, Serialize};

use crate::classify::{RequestClass, classify};
use crate::fallback::{self, FallbackKind};
use crate::worker::OfflineWorker;

/// Where an intercepted response came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseSource {
    Cache { partition: String },
    Network,
    Fallback { fallback: FallbackKind },
}

/// Decision for one intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the platform performs the request itself.
    PassThrough,
    Respond { response: Response, source: ResponseSource },
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::PassThrough => None,
            FetchOutcome::Respond { response, .. } => Some(response),
        }
    }

    pub fn source(&self) -> Option<&ResponseSource> {
        match self {
            FetchOutcome::PassThrough => None,
            FetchOutcome::Respond { source, .. } => Some(source),
        }
    }
}

impl OfflineWorker {
    pub(crate) async fn handle_fetch(&self, request: &Request) -> FetchOutcome {
        let settings = self.settings();

        if !request.is_get() {
            tracing::debug!(method = %request.method, url = %request.url, "pass through: non-GET");
            return FetchOutcome::PassThrough;
        }
        if !same_origin(&request.url, &settings.origin) {
            tracing::debug!(url = %request.url, "pass through: cross-origin");
            return FetchOutcome::PassThrough;
        }

        match self.store().match_in(&settings.partitions(), request).await {
            Ok(Some(entry)) => {
                tracing::debug!(url = %request.url, partition = %entry.partition, "cache hit");
                return FetchOutcome::Respond {
                    response: entry.response,
                    source: ResponseSource::Cache { partition: entry.partition },
                };
            }
            Ok(None) => tracing::debug!(url = %request.url, "cache miss"),
            Err(e) => tracing::warn!(url = %request.url, error = %e, "cache lookup failed; trying network"),
        }

        match self.fetch_bounded(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_copy(request, &response).await;
                }
                FetchOutcome::Respond { response, source: ResponseSource::Network }
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "network request failed");
                self.offline_fallback(request).await
            }
        }
    }

    /// Opportunistically cache a 200. Failures are logged and dropped.
    async fn store_copy(&self, request: &Request, response: &Response) {
        let settings = self.settings();
        let partition = match classify(&request.url, &settings.static_manifest, &settings.static_extensions) {
            RequestClass::Static => &settings.static_cache,
            RequestClass::Dynamic => &settings.dynamic_cache,
        };

        let copy = response.clone();
        let stored = async {
            self.store().open_partition(partition).await?;
            self.store().put_entry(partition, &settings.partitions(), request, &copy).await
        }
        .await;

        match stored {
            Ok(()) => tracing::debug!(url = %request.url, partition = %partition, "cached network response"),
            Err(e) => tracing::warn!(url = %request.url, partition = %partition, error = %e, "failed to cache response"),
        }
    }

    async fn offline_fallback(&self, request: &Request) -> FetchOutcome {
        let (response, fallback) = if request.accepts("text/html") {
            match self.cached_offline_page().await {
                Some(page) => (page, FallbackKind::CachedOfflinePage),
                None => (fallback::offline_page(), FallbackKind::OfflinePage),
            }
        } else if request.accepts("image/") {
            (fallback::offline_image(), FallbackKind::ImagePlaceholder)
        } else {
            (fallback::service_unavailable(), FallbackKind::ServiceUnavailable)
        };

        tracing::info!(url = %request.url, ?fallback, "serving offline fallback");
        FetchOutcome::Respond { response, source: ResponseSource::Fallback { fallback } }
    }

    async fn cached_offline_page(&self) -> Option<Response> {
        let settings = self.settings();
        let key = Request::get(settings.offline_page.clone());
        match self.store().match_in(&settings.partitions(), &key).await {
            Ok(entry) => entry.map(|e| e.response),
            Err(e) => {
                tracing::warn!(error = %e, "offline page lookup failed");
                None
            }
        }
    }
}
