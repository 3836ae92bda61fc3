//! ViewRenderer port - テンプレート描画
//!
//! `render(view, data, options)` は primary render ごとに 1 回、
//! fragment ごとに 1 回呼ばれます。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Response format of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    #[default]
    Html,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOptions {
    #[serde(default)]
    pub format: Format,
}

impl ViewOptions {
    pub fn html() -> Self {
        Self { format: Format::Html }
    }

    pub fn json() -> Self {
        Self { format: Format::Json }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown view: {0}")]
    UnknownView(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("json encode: {0}")]
    Json(#[from] serde_json::Error),
}

/// Templating collaborator.
pub trait ViewRenderer: Send + Sync {
    fn render(&self, view: &str, data: &Value, options: &ViewOptions) -> Result<String, RenderError>;
}

impl<F> ViewRenderer for F
where
    F: Fn(&str, &Value, &ViewOptions) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, view: &str, data: &Value, options: &ViewOptions) -> Result<String, RenderError> {
        self(view, data, options)
    }
}

/// Renderer for contexts that only answer with JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoViews;

impl ViewRenderer for NoViews {
    fn render(&self, view: &str, _data: &Value, _options: &ViewOptions) -> Result<String, RenderError> {
        Err(RenderError::UnknownView(view.to_string()))
    }
}
