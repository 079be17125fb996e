//! Request identity keys.
//!
//! A cache entry is addressed by its method and URL. The fragment never
//! reaches the server, so it is not part of the identity.

use sha2::{Digest, Sha256};
use url::Url;

/// Compute the storage key for a request identity.
pub fn compute_request_key(method: &str, url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_key_stability() {
        let a = compute_request_key("GET", &url("http://localhost:8080/index.html"));
        let b = compute_request_key("GET", &url("http://localhost:8080/index.html"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_method_case_insensitive() {
        let a = compute_request_key("get", &url("http://localhost:8080/"));
        let b = compute_request_key("GET", &url("http://localhost:8080/"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_ignores_fragment() {
        let a = compute_request_key("GET", &url("http://localhost:8080/news#latest"));
        let b = compute_request_key("GET", &url("http://localhost:8080/news"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_keeps_query() {
        let a = compute_request_key("GET", &url("http://localhost:8080/data/news.json?page=1"));
        let b = compute_request_key("GET", &url("http://localhost:8080/data/news.json?page=2"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_format() {
        let key = compute_request_key("GET", &url("http://localhost:8080/"));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
