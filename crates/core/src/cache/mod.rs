//! SQLite-backed store for cache partitions and pending offline actions.
//!
//! This module provides persistent storage using SQLite with async access via
//! tokio-rusqlite. It supports:
//!
//! - Named, versioned cache partitions mapping request identity to response
//! - All-or-nothing bulk population for install-time pre-caching
//! - A keyed queue of offline writes awaiting background-sync replay
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod partitions;
pub mod queue;

pub use crate::Error;

pub use connection::CacheDb;
pub use partitions::CachedEntry;
pub use queue::{ActionKind, PendingAction};
