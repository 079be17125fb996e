//! Resolved worker settings.
//!
//! Built once from [`AppConfig`] and handed to the worker constructor, so
//! cache names and lists can be injected per test instead of living in globals.

use std::time::Duration;

use empress_client::resolve;
use empress_core::{ActionKind, AppConfig, ConfigError, NotificationConfig};
use url::Url;

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// The controlled site's origin.
    pub origin: Url,
    pub static_cache: String,
    pub dynamic_cache: String,
    /// Paths pre-cached into the static partition.
    pub static_manifest: Vec<String>,
    /// Paths pre-cached into the dynamic partition.
    pub api_endpoints: Vec<String>,
    /// Lower-cased path suffixes that mark a static asset.
    pub static_extensions: Vec<String>,
    pub offline_page: Url,
    pub newsletter_endpoint: Url,
    pub analytics_endpoint: Url,
    /// Bounded wait for every worker-issued network request.
    pub timeout: Duration,
    pub notification: NotificationConfig,
}

impl WorkerSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let origin = config.origin_url()?;
        let join = |field: &str, path: &str| {
            resolve(&origin, path).map_err(|e| ConfigError::Invalid { field: field.into(), reason: e.to_string() })
        };

        Ok(Self {
            static_cache: config.static_cache_name(),
            dynamic_cache: config.dynamic_cache_name(),
            static_manifest: config.static_manifest.clone(),
            api_endpoints: config.api_endpoints.clone(),
            static_extensions: config.static_extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            offline_page: join("offline_page", &config.offline_page)?,
            newsletter_endpoint: join("newsletter_endpoint", &config.newsletter_endpoint)?,
            analytics_endpoint: join("analytics_endpoint", &config.analytics_endpoint)?,
            timeout: config.timeout(),
            notification: config.notification.clone(),
            origin,
        })
    }

    /// The two current partition names, static first.
    pub fn partitions(&self) -> [String; 2] {
        [self.static_cache.clone(), self.dynamic_cache.clone()]
    }

    pub fn replay_endpoint(&self, kind: ActionKind) -> &Url {
        match kind {
            ActionKind::NewsletterSubscription => &self.newsletter_endpoint,
            ActionKind::AnalyticsData => &self.analytics_endpoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_config() {
        let settings = WorkerSettings::from_config(&AppConfig::default()).unwrap();
        assert_eq!(settings.static_cache, "pageant-empress-static-v1");
        assert_eq!(settings.dynamic_cache, "pageant-empress-dynamic-v1");
        assert_eq!(settings.offline_page.as_str(), "http://localhost:8080/offline.html");
        assert_eq!(
            settings.replay_endpoint(ActionKind::NewsletterSubscription).as_str(),
            "http://localhost:8080/api/newsletter/subscribe"
        );
        assert_eq!(settings.replay_endpoint(ActionKind::AnalyticsData).path(), "/api/analytics");
        assert_eq!(settings.timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_injected_version() {
        let config = AppConfig { version: "2024-06-01".into(), ..Default::default() };
        let settings = WorkerSettings::from_config(&config).unwrap();
        assert_eq!(settings.partitions(), ["pageant-empress-static-2024-06-01", "pageant-empress-dynamic-2024-06-01"]);
    }

    #[test]
    fn test_extensions_lowercased() {
        let config = AppConfig { static_extensions: vec![".PNG".into()], ..Default::default() };
        let settings = WorkerSettings::from_config(&config).unwrap();
        assert_eq!(settings.static_extensions, vec![".png"]);
    }
}
