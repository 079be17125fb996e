//! Static vs. dynamic request classification.

use serde::{Deserialize, Serialize};
use url::Url;

/// Which partition a freshly fetched response belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    /// Shell assets: markup in the manifest, stylesheets, scripts, images.
    Static,
    /// Everything else, typically JSON content.
    Dynamic,
}

/// Static if the path is listed in the manifest or ends in a static extension.
pub fn classify(url: &Url, manifest: &[String], extensions: &[String]) -> RequestClass {
    let path = url.path();
    if manifest.iter().any(|entry| entry == path) {
        return RequestClass::Static;
    }

    let lower = path.to_ascii_lowercase();
    if extensions.iter().any(|ext| lower.ends_with(ext.as_str())) {
        RequestClass::Static
    } else {
        RequestClass::Dynamic
    }
}
