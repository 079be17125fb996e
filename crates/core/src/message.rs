//! Request and response values exchanged between the page, the worker and the network.
//!
//! Bodies are [`Bytes`], so cloning a response hands out a second handle to the
//! same buffer instead of consuming the original.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Ordered header list with case-insensitive lookup.
pub type HeaderList = Vec<(String, String)>;

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// An outbound request issued by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: Url,
    #[serde(default)]
    pub headers: HeaderList,
    #[serde(default)]
    pub body: Option<Bytes>,
}

fn default_method() -> String {
    "GET".into()
}

impl Request {
    /// A bodiless GET request.
    pub fn get(url: Url) -> Self {
        Self { method: default_method(), url, headers: Vec::new(), body: None }
    }

    /// A POST request carrying a JSON document.
    pub fn post_json(url: Url, body: &serde_json::Value) -> Self {
        Self {
            method: "POST".into(),
            url,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: Some(Bytes::from(body.to_string())),
        }
    }

    /// Builder-style header append.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// The `Accept` header, if any.
    pub fn accept(&self) -> Option<&str> {
        self.header("accept")
    }

    /// Whether any media range in `Accept` starts with `prefix` (`text/html`, `image/`).
    pub fn accepts(&self, prefix: &str) -> bool {
        self.accept().is_some_and(|accept| {
            accept
                .split(',')
                .map(|range| range.split(';').next().unwrap_or("").trim())
                .any(|range| range.to_ascii_lowercase().starts_with(prefix))
        })
    }
}

/// A response from the network, a cache partition or a synthesized fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: HeaderList,
    #[serde(default)]
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self { status, status_text: status_text.into(), headers: Vec::new(), body: body.into() }
    }

    /// A 200 response with the given content type.
    pub fn ok(content_type: &str, body: impl Into<Bytes>) -> Self {
        Self::new(200, "OK", body).with_header("Content-Type", content_type)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Exactly 200; the only status the fetch policy caches opportunistically.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = Request::get(url("http://localhost/")).with_header("ACCEPT", "text/html");
        assert_eq!(req.header("accept"), Some("text/html"));
        assert_eq!(req.accept(), Some("text/html"));
    }

    #[test]
    fn test_accepts_media_ranges() {
        let req = Request::get(url("http://localhost/"))
            .with_header("Accept", "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8");
        assert!(req.accepts("text/html"));
        assert!(!req.accepts("image/"));

        let img = Request::get(url("http://localhost/a.png")).with_header("Accept", "image/avif, image/*;q=0.8");
        assert!(img.accepts("image/"));
    }

    #[test]
    fn test_accepts_without_header() {
        let req = Request::get(url("http://localhost/data/x.json"));
        assert!(!req.accepts("text/html"));
        assert!(!req.accepts("image/"));
    }

    #[test]
    fn test_method_checks() {
        assert!(Request::get(url("http://localhost/")).is_get());
        let post = Request::post_json(url("http://localhost/api"), &serde_json::json!({"a": 1}));
        assert!(!post.is_get());
        assert_eq!(post.header("content-type"), Some("application/json"));
        assert_eq!(post.body.as_deref(), Some(br#"{"a":1}"#.as_slice()));
    }

    #[test]
    fn test_response_status_helpers() {
        assert!(Response::new(200, "OK", "").is_ok());
        assert!(!Response::new(204, "No Content", "").is_ok());
        assert!(Response::new(204, "No Content", "").is_success());
        assert!(!Response::new(404, "Not Found", "").is_success());
    }

    #[test]
    fn test_request_deserialize_defaults() {
        let req: Request = serde_json::from_str(r#"{"url": "http://localhost/index.html"}"#).unwrap();
        assert_eq!(req.method, "GET");
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }
}
