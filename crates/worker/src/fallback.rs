//! Responses synthesized when a cache miss cannot reach the network.
//!
//! Both documents are self-contained: inline styles, no external fonts,
//! scripts or images, so they render with no connectivity at all.

use empress_core::Response;
use serde::{Deserialize, Serialize};

/// Which fallback answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    /// The pre-built page stored under the reserved offline key.
    CachedOfflinePage,
    /// The synthesized HTML page.
    OfflinePage,
    /// The synthesized SVG placeholder.
    ImagePlaceholder,
    /// Plain-text 503.
    ServiceUnavailable,
}

const OFFLINE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Offline - Pageant Empress</title>
  <style>
    body {
      font-family: system-ui, -apple-system, "Segoe UI", sans-serif;
      display: flex;
      align-items: center;
      justify-content: center;
      min-height: 100vh;
      margin: 0;
      background: linear-gradient(135deg, #8a2be2, #ff69b4);
      color: #fff;
      text-align: center;
    }
    .offline-container { max-width: 400px; padding: 2rem; }
    .offline-icon { font-size: 4rem; margin-bottom: 1rem; }
    .offline-title { font-size: 2rem; margin-bottom: 1rem; }
    .offline-message { font-size: 1.1rem; opacity: 0.9; margin-bottom: 2rem; }
    .retry-button {
      background: rgba(255, 255, 255, 0.2);
      border: 2px solid #fff;
      color: #fff;
      padding: 0.75rem 1.5rem;
      border-radius: 0.5rem;
      font-size: 1rem;
      cursor: pointer;
    }
    .retry-button:hover { background: rgba(255, 255, 255, 0.3); }
  </style>
</head>
<body>
  <div class="offline-container">
    <div class="offline-icon">&#127760;</div>
    <h1 class="offline-title">You're Offline</h1>
    <p class="offline-message">
      It looks like you're not connected to the internet.
      Some content may not be available right now.
    </p>
    <button class="retry-button" onclick="window.location.reload()">Try Again</button>
  </div>
</body>
</html>
"#;

const OFFLINE_SVG: &str = r##"<svg width="400" height="300" xmlns="http://www.w3.org/2000/svg"><rect width="100%" height="100%" fill="#f4f4f4"/><text x="50%" y="50%" text-anchor="middle" fill="#888">Image not available offline</text></svg>"##;

/// The synthesized "you are offline" page.
pub fn offline_page() -> Response {
    Response::ok("text/html; charset=utf-8", OFFLINE_HTML).with_header("Cache-Control", "no-store")
}

/// Placeholder for images that are neither cached nor reachable.
pub fn offline_image() -> Response {
    Response::ok("image/svg+xml", OFFLINE_SVG).with_header("Cache-Control", "no-store")
}

/// Generic failure for everything else.
pub fn service_unavailable() -> Response {
    Response::new(503, "Service Unavailable", "Offline - Content not available")
        .with_header("Content-Type", "text/plain; charset=utf-8")
}
