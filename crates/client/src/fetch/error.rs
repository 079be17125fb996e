//! Network error types.

use std::sync::Arc;

use empress_core::Error;

/// Errors from a network fetch. Any HTTP status is a response, not an error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    /// No response at all (DNS, refused connection, reset, TLS).
    #[error("transport error: {0}")]
    Transport(Arc<reqwest::Error>),

    /// The request did not complete within the bounded wait.
    #[error("request timeout after {0}ms")]
    Timeout(u64),

    /// Response body exceeded the configured limit.
    #[error("response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },

    /// The request could not be built (bad method or header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transport failure reported by a non-reqwest backend.
    #[error("offline: {0}")]
    Offline(String),
}

impl NetworkError {
    /// Whether the page should be treated as offline for this request.
    pub fn is_offline(&self) -> bool {
        matches!(self, NetworkError::Transport(_) | NetworkError::Timeout(_) | NetworkError::Offline(_))
    }

    /// Classify a reqwest failure, reporting timeouts with the configured wait.
    pub fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout(timeout_ms)
        } else if err.is_builder() {
            NetworkError::InvalidRequest(err.to_string())
        } else {
            NetworkError::Transport(Arc::new(err))
        }
    }
}

impl From<NetworkError> for Error {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Timeout(ms) => Error::Timeout(format!("{ms}ms")),
            NetworkError::Transport(e) => Error::Network(e.to_string()),
            NetworkError::Offline(msg) => Error::Network(msg),
            e @ (NetworkError::TooLarge { .. } | NetworkError::InvalidRequest(_)) => Error::InvalidInput(e.to_string()),
        }
    }
}
