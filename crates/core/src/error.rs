//! Unified error types for the offline worker.
//!
//! Every fallible store, network and parsing operation in the workspace
//! eventually reports one of these variants.

use tokio_rusqlite::rusqlite;

/// Unified error type shared by the store, the network client and the worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input (e.g. caching a non-success response).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A URL could not be parsed or resolved.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Only GET requests may be stored in a cache partition.
    #[error("UNSUPPORTED_METHOD: {0}")]
    UnsupportedMethod(String),

    /// The named cache partition has not been opened.
    #[error("PARTITION_NOT_FOUND: {0}")]
    PartitionNotFound(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Transport-level network failure (no response at all).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// The network did not answer within the configured wait.
    #[error("NETWORK_TIMEOUT: {0}")]
    Timeout(String),

    /// A stored value could not be encoded or decoded.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether the error means "no response from the network".
    ///
    /// These are the failures the fetch policy recovers from with an offline fallback.
    pub fn is_offline(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
