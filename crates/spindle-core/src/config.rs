//! Renderer configuration.

use serde::{Deserialize, Serialize};

/// Knobs of the progressive renderer.
///
/// Every field has a default, so a partial JSON document is enough:
/// `{"client_object": "Pagelets"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Global JS object fragment scripts call into (`<client_object>.deliver(..)`).
    pub client_object: String,

    /// Emit the bootstrap script before the first fragment.
    pub bootstrap: bool,

    pub html_content_type: String,

    pub json_content_type: String,

    /// Status used when the primary render fails before headers were sent.
    pub error_status: u16,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            client_object: "Spindle".to_string(),
            bootstrap: true,
            html_content_type: "text/html; charset=utf-8".to_string(),
            json_content_type: "application/json; charset=utf-8".to_string(),
            error_status: 500,
        }
    }
}

impl RendererConfig {
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
