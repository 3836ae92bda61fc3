//! HandlebarsViews - 名前付きテンプレートの ViewRenderer
//!
//! - HTML: 登録済みテンプレートを handlebars で描画（HTML エスケープあり）
//! - JSON: テンプレートを使わず data をそのまま JSON にする

use handlebars::Handlebars;
use serde_json::Value;

use crate::ports::{Format, RenderError, ViewOptions, ViewRenderer};

#[derive(Clone, Default)]
pub struct HandlebarsViews {
    handlebars: Handlebars<'static>,
}

impl HandlebarsViews {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.set_dev_mode(false);
        Self { handlebars }
    }

    /// Register `source` under `name`. A later registration replaces it.
    pub fn register(&mut self, name: &str, source: &str) -> Result<(), RenderError> {
        self.handlebars
            .register_template_string(name, source)
            .map_err(|e| RenderError::Template(e.to_string()))
    }

    pub fn with_view(mut self, name: &str, source: &str) -> Result<Self, RenderError> {
        self.register(name, source)?;
        Ok(self)
    }

    pub fn has_view(&self, name: &str) -> bool {
        self.handlebars.has_template(name)
    }
}

impl ViewRenderer for HandlebarsViews {
    fn render(&self, view: &str, data: &Value, options: &ViewOptions) -> Result<String, RenderError> {
        if options.format == Format::Json {
            return Ok(serde_json::to_string(data)?);
        }
        if !self.has_view(view) {
            return Err(RenderError::UnknownView(view.to_string()));
        }
        self.handlebars
            .render(view, data)
            .map_err(|e| RenderError::Template(e.to_string()))
    }
}
