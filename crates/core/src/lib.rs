//! Core types and shared functionality for the Pageant Empress offline worker.
//!
//! This crate provides:
//! - Request/response values shared by the worker and the network client
//! - SQLite-backed cache partitions and the pending offline-action queue
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod message;

pub use cache::{ActionKind, CacheDb, CachedEntry, PendingAction};
pub use config::{AppConfig, ConfigError, NotificationConfig};
pub use error::Error;
pub use message::{HeaderList, Request, Response};
