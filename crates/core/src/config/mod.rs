//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (EMPRESS_SW_*)
//! 2. TOML config file (if EMPRESS_SW_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Cache names, the pre-cache lists and the replay endpoints all live here
//! so that a deploy only has to bump `version` to roll the caches.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (EMPRESS_SW_*)
/// 2. TOML config file (if EMPRESS_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin of the site the worker controls (scheme, host, port).
    ///
    /// Set via EMPRESS_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Version token appended to both cache partition names.
    ///
    /// Set via EMPRESS_SW_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix shared by both cache partition names.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Shell assets pre-cached into the static partition on install.
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,

    /// JSON content endpoints pre-cached into the dynamic partition on install.
    #[serde(default = "default_api_endpoints")]
    pub api_endpoints: Vec<String>,

    /// Path suffixes that classify a URL as a static asset.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// Reserved cache key of a pre-built offline page.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Replay endpoint for queued newsletter subscriptions.
    #[serde(default = "default_newsletter_endpoint")]
    pub newsletter_endpoint: String,

    /// Replay endpoint for queued analytics batches.
    #[serde(default = "default_analytics_endpoint")]
    pub analytics_endpoint: String,

    /// Path to SQLite store database.
    ///
    /// Set via EMPRESS_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via EMPRESS_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to read per network response.
    ///
    /// Set via EMPRESS_SW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Bounded wait for any worker-issued network request, in milliseconds.
    ///
    /// Set via EMPRESS_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Push notification defaults.
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Defaults used when a push message carries no (or a partial) payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_body")]
    pub body: String,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_badge")]
    pub badge: String,
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            body: default_body(),
            url: default_url(),
            icon: default_icon(),
            badge: default_badge(),
            vibrate: default_vibrate(),
        }
    }
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_cache_prefix() -> String {
    "pageant-empress".into()
}

fn default_static_manifest() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/assets/css/main.css",
        "/assets/css/components.css",
        "/assets/css/animations.css",
        "/assets/js/app.js",
        "/assets/js/components/hero.js",
        "/assets/js/components/carousel.js",
        "/assets/js/components/navigation.js",
        "/assets/js/components/counters.js",
        "/assets/js/utils/analytics.js",
        "/assets/js/utils/performance.js",
        "/assets/images/logo.png",
        "/manifest.json",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_api_endpoints() -> Vec<String> {
    ["/data/news.json", "/data/videos.json", "/data/carousel.json", "/data/gallery.json", "/data/events.json"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_static_extensions() -> Vec<String> {
    [".css", ".js", ".png", ".jpg", ".svg"].into_iter().map(String::from).collect()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_newsletter_endpoint() -> String {
    "/api/newsletter/subscribe".into()
}

fn default_analytics_endpoint() -> String {
    "/api/analytics".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./empress-sw.sqlite")
}

fn default_user_agent() -> String {
    "empress-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_title() -> String {
    "Pageant Empress".into()
}

fn default_body() -> String {
    "New pageant news is available!".into()
}

fn default_url() -> String {
    "/".into()
}

fn default_icon() -> String {
    "/assets/icons/icon-192x192.png".into()
}

fn default_badge() -> String {
    "/assets/icons/badge-72x72.png".into()
}

fn default_vibrate() -> Vec<u32> {
    vec![100, 50, 100]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            static_manifest: default_static_manifest(),
            api_endpoints: default_api_endpoints(),
            static_extensions: default_static_extensions(),
            offline_page: default_offline_page(),
            newsletter_endpoint: default_newsletter_endpoint(),
            analytics_endpoint: default_analytics_endpoint(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            notification: NotificationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the static partition for the current version.
    pub fn static_cache_name(&self) -> String {
        format!("{}-static-{}", self.cache_prefix, self.version)
    }

    /// Name of the dynamic partition for the current version.
    pub fn dynamic_cache_name(&self) -> String {
        format!("{}-dynamic-{}", self.cache_prefix, self.version)
    }

    /// The site origin as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(url),
            _ => Err(ConfigError::Invalid { field: "origin".into(), reason: "must be an http(s) URL with a host".into() }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `EMPRESS_SW_`
    /// 2. TOML file from `EMPRESS_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("EMPRESS_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("EMPRESS_SW_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
