//! ProgressiveRenderer - buffered / pipe の 2 モード
//!
//! # 状態遷移
//! - buffered: collecting → rendering → done
//! - pipe: collecting-fragment → fragment-ready → (repeat) → finalizing → done
//!
//! # 不変条件
//! - primary の書き込みは、どの fragment の書き込みよりも先
//! - end は primary 済み && pending_fragments == 0 && outstanding == 0 のときに 1 回だけ

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::RendererConfig;
use crate::domain::{FragmentId, RenderRequired, TaskName, TaskRecord};
use crate::error::ContextError;
use crate::ports::{Format, HttpExchange, RenderError, ViewOptions, ViewRenderer};
use crate::scheduler::TaskRegistry;

use super::fragment::Fragment;
use super::output::ResponseWriter;
use super::primary::PrimaryRender;
use super::script::{self, Delivery};

pub struct ProgressiveRenderer {
    config: RendererConfig,
    views: Arc<dyn ViewRenderer>,
    primary: Option<PrimaryRender>,
    fragments: Vec<Fragment>,
    /// Rendered fragments waiting for the primary write.
    queued: VecDeque<Delivery>,
    /// Fragments that were rendered (guards duplicate completion signals).
    rendered: HashSet<FragmentId>,
    pending_fragments: usize,
    streaming: bool,
    primary_rendered: bool,
    bootstrapped: bool,
    failure: Option<RenderError>,
}

impl ProgressiveRenderer {
    pub fn new(views: Arc<dyn ViewRenderer>, config: RendererConfig) -> Self {
        Self {
            config,
            views,
            primary: None,
            fragments: Vec::new(),
            queued: VecDeque::new(),
            rendered: HashSet::new(),
            pending_fragments: 0,
            streaming: false,
            primary_rendered: false,
            bootstrapped: false,
            failure: None,
        }
    }

    pub fn set_config(&mut self, config: RendererConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Declare the primary render. A later declaration replaces this one.
    pub fn declare(&mut self, primary: PrimaryRender) {
        if let Some(previous) = self.primary.replace(primary) {
            debug!(?previous, "primary render re-declared; last declaration wins");
        }
    }

    pub fn add_fragment(&mut self, fragment: Fragment) -> Result<FragmentId, ContextError> {
        if self.fragments.iter().any(|f| f.id == fragment.id) {
            return Err(ContextError::DuplicateFragment(fragment.id));
        }
        let id = fragment.id.clone();
        self.fragments.push(fragment);
        self.pending_fragments += 1;
        Ok(id)
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn is_piped(&self, task: &str) -> bool {
        self.fragments.iter().any(|f| f.task.as_str() == task)
    }

    /// Explicit streaming, or an HTML response with at least one pipe.
    pub fn is_streaming(&self) -> bool {
        if self.primary_rendered {
            return self.streaming;
        }
        self.primary
            .as_ref()
            .is_some_and(PrimaryRender::is_explicitly_streaming)
            || !self.fragments.is_empty()
    }

    pub fn validate(&self) -> Result<(), ContextError> {
        let json_primary = self
            .primary
            .as_ref()
            .is_some_and(|p| p.format() == Format::Json);
        if json_primary && !self.fragments.is_empty() {
            return Err(ContextError::PipeOnJsonResponse);
        }
        Ok(())
    }

    /// Fix the render mode. Called once, when the request starts driving tasks.
    pub fn start(&mut self) {
        self.streaming = self.is_streaming();
        if self.primary.is_none() {
            // primary が宣言されていなければ、fragment はすぐに流してよい
            self.primary_rendered = true;
        }
        debug!(
            streaming = self.streaming,
            fragments = self.fragments.len(),
            "renderer started"
        );
    }

    /// Does the primary render wait for this task?
    pub fn waits_for(&self, record: &TaskRecord) -> bool {
        match record.render_required() {
            RenderRequired::Required => true,
            RenderRequired::Deferred => false,
            RenderRequired::Auto => !(self.is_streaming() && self.is_piped(record.name())),
        }
    }

    pub fn primary_set(&self, registry: &TaskRegistry) -> Vec<TaskName> {
        registry
            .records()
            .filter(|record| self.waits_for(record))
            .map(|record| record.name().clone())
            .collect()
    }

    pub fn primary_ready(&self, registry: &TaskRegistry) -> bool {
        self.primary_rendered || registry.all_complete(&self.primary_set(registry))
    }

    /// Render fragment `id` from its task's completion and queue it for flushing.
    pub fn fragment_ready(&mut self, id: &FragmentId, registry: &TaskRegistry) {
        let Some(fragment) = self.fragments.iter().find(|f| &f.id == id) else {
            warn!(fragment = %id, "completion for unknown fragment ignored");
            return;
        };
        let Some(completion) = registry.completion(&fragment.task) else {
            return;
        };
        if self.rendered.contains(id) {
            return;
        }

        let data = fragment.data(completion);
        let options = ViewOptions {
            format: fragment.format,
        };
        let content = match self.views.render(&fragment.view, &data, &options) {
            Ok(content) => content,
            Err(err) => {
                warn!(fragment = %id, error = %err, "fragment render failed; delivering empty content");
                String::new()
            }
        };

        self.rendered.insert(id.clone());
        self.queued.push_back(Delivery {
            id: id.clone(),
            content,
        });
    }

    /// Write whatever can be written now: the primary body once its tasks are
    /// complete, then every queued fragment, then the terminal end.
    pub async fn flush<E: HttpExchange>(&mut self, out: &mut ResponseWriter<E>, registry: &TaskRegistry) {
        if !self.primary_rendered {
            if !self.primary_ready(registry) {
                return;
            }
            self.write_primary(out, registry).await;
        }

        while let Some(delivery) = self.queued.pop_front() {
            self.write_fragment(out, delivery).await;
        }

        if self.pending_fragments == 0 && registry.outstanding() == 0 && !out.is_ended() {
            debug!(bytes = out.bytes_written(), "response finished");
            out.end(None).await;
        }
    }

    async fn write_primary<E: HttpExchange>(&mut self, out: &mut ResponseWriter<E>, registry: &TaskRegistry) {
        let completions = registry.snapshot(&self.primary_set(registry));
        let streaming = self.streaming;
        let Some(primary) = self.primary.take() else {
            self.primary_rendered = true;
            return;
        };
        self.primary_rendered = true;

        let format = primary.format();
        let body = match primary {
            PrimaryRender::Json { data } => {
                serde_json::to_string(&data.build(&completions)).map_err(RenderError::from)
            }
            PrimaryRender::View {
                view,
                data,
                options,
                ..
            } => self.views.render(&view, &data.build(&completions), &options),
        };

        let body = match body {
            Ok(body) => body,
            Err(err) => {
                error!(error = %err, "primary render failed");
                out.fail(self.config.error_status, "Internal Server Error").await;
                self.failure = Some(err);
                return;
            }
        };

        out.begin(self.content_type(format));
        let finished = !streaming && self.pending_fragments == 0 && registry.outstanding() == 0;
        debug!(len = body.len(), streaming, tasks = completions.len(), "primary rendered");
        if finished {
            out.end(Some(body.as_bytes())).await;
        } else {
            out.write(body.as_bytes()).await;
        }
    }

    async fn write_fragment<E: HttpExchange>(&mut self, out: &mut ResponseWriter<E>, delivery: Delivery) {
        self.pending_fragments = self.pending_fragments.saturating_sub(1);

        let mut chunk = String::new();
        if self.config.bootstrap && !self.bootstrapped {
            chunk.push_str(&script::bootstrap(&self.config.client_object));
            self.bootstrapped = true;
        }
        match script::delivery(&self.config.client_object, &delivery) {
            Ok(s) => chunk.push_str(&s),
            Err(err) => warn!(fragment = %delivery.id, error = %err, "fragment payload encode failed"),
        }

        out.begin(&self.config.html_content_type);
        let written = out.write(chunk.as_bytes()).await;
        debug!(fragment = %delivery.id, written, pending = self.pending_fragments, "fragment flushed");
    }

    fn content_type(&self, format: Format) -> &str {
        match format {
            Format::Html => &self.config.html_content_type,
            Format::Json => &self.config.json_content_type,
        }
    }

    pub fn pending_fragments(&self) -> usize {
        self.pending_fragments
    }

    pub fn primary_rendered(&self) -> bool {
        self.primary_rendered
    }

    pub fn take_failure(&mut self) -> Option<RenderError> {
        self.failure.take()
    }
}
