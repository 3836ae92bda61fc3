//! RequestContext - 1 リクエスト分のタスク API
//!
//! # 使い方
//! 1. `assign(name, deps, work)` でタスクを登録（`.then` / `.render_required` / `.pipe`）
//! 2. `render_json` / `render_view` / `render_view_streaming` で primary を宣言
//! 3. `respond().await` でグラフを検証し、タスクを走らせ、レスポンスを書き切る
//!
//! # 設計原則
//! - 登録フェーズでは何も実行しない（すべての購読が揃ってから drain）
//! - driver は `respond()` の future 1 つだけ。状態はロックなしで所有する
//! - タスクの失敗は Completion に閉じ込め、リクエスト全体は止めない

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{Value, json};
use tracing::{Instrument, debug, debug_span, warn};
use ulid::Ulid;

use crate::config::RendererConfig;
use crate::domain::{
    Completion, Dependencies, FragmentId, RenderRequired, TaskCounts, TaskName, TaskResult, WorkFn,
};
use crate::error::ContextError;
use crate::ports::{HttpExchange, ViewOptions, ViewRenderer};
use crate::render::{Fragment, PipeOptions, PrimaryData, PrimaryRender, ProgressiveRenderer, ResponseWriter};
use crate::scheduler::{DependencyNotifier, Listener, TaskRegistry, TaskRunner};

pub struct RequestContext<E> {
    request_id: Ulid,
    registry: TaskRegistry,
    notifier: DependencyNotifier,
    runner: TaskRunner,
    renderer: ProgressiveRenderer,
    out: ResponseWriter<E>,
    /// Most recently registered task; target of `RequestContext::pipe`.
    last_task: Option<TaskName>,
    responded: bool,
}

impl<E: HttpExchange> RequestContext<E> {
    pub fn new(exchange: E, views: impl ViewRenderer + 'static) -> Self {
        Self {
            request_id: Ulid::new(),
            registry: TaskRegistry::new(),
            notifier: DependencyNotifier::new(),
            runner: TaskRunner::new(),
            renderer: ProgressiveRenderer::new(Arc::new(views), RendererConfig::default()),
            out: ResponseWriter::new(exchange),
            last_task: None,
            responded: false,
        }
    }

    pub fn with_config(mut self, config: RendererConfig) -> Self {
        self.renderer.set_config(config);
        self
    }

    pub fn request_id(&self) -> Ulid {
        self.request_id
    }

    /// Register a task. `work` receives the completions of `dependencies`
    /// once every one of them has completed.
    pub fn assign<F, Fut>(
        &mut self,
        name: impl Into<TaskName>,
        dependencies: &[&str],
        work: F,
    ) -> Result<TaskHandle<'_, E>, ContextError>
    where
        F: FnOnce(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        let name = name.into();
        let dependencies: Vec<TaskName> = dependencies.iter().copied().map(TaskName::from).collect();
        let work: WorkFn = Box::new(move |deps: Dependencies| work(deps).boxed());

        self.registry
            .register(name.clone(), dependencies, work, RenderRequired::Auto)?;

        // 購読は登録時に張る（respond() 前に完了することはない）
        if let Some(record) = self.registry.get(&name) {
            self.notifier
                .subscribe_dependencies(&name, record.dependencies());
        }
        debug!(task = %name, "task registered");

        self.last_task = Some(name.clone());
        Ok(TaskHandle { ctx: self, name })
    }

    /// Bind a fragment to the most recently registered task.
    pub fn pipe(&mut self, view: impl Into<String>, options: PipeOptions) -> Result<FragmentId, ContextError> {
        let task = self.last_task.clone().ok_or(ContextError::PipeWithoutTask)?;
        self.pipe_task(task, view.into(), options)
    }

    fn pipe_task(&mut self, task: TaskName, view: String, options: PipeOptions) -> Result<FragmentId, ContextError> {
        let fragment = Fragment::new(task.clone(), view, options);
        let id = self.renderer.add_fragment(fragment)?;
        self.notifier
            .on_task_complete(task.clone(), Listener::Fragment(id.clone()));
        debug!(task = %task, fragment = %id, "fragment piped");
        Ok(id)
    }

    pub fn render_json(&mut self, data: Value) {
        self.renderer.declare(PrimaryRender::Json {
            data: PrimaryData::Merge(data),
        });
    }

    /// `render_json({})`: answer with the results of the primary set only.
    pub fn render_empty(&mut self) {
        self.render_json(json!({}));
    }

    pub fn render_view(&mut self, view: impl Into<String>, data: Value, options: ViewOptions) {
        self.declare_view(view.into(), PrimaryData::Merge(data), options, false);
    }

    /// Like `render_view`, but keeps the response open for fragments even
    /// when nothing is piped yet.
    pub fn render_view_streaming(&mut self, view: impl Into<String>, data: Value, options: ViewOptions) {
        self.declare_view(view.into(), PrimaryData::Merge(data), options, true);
    }

    /// Render `view` with data built by `aggregate` from the primary set's completions.
    pub fn render_view_with<A>(&mut self, view: impl Into<String>, aggregate: A, options: ViewOptions)
    where
        A: FnOnce(&Dependencies) -> Value + Send + 'static,
    {
        self.declare_view(view.into(), PrimaryData::Aggregate(Box::new(aggregate)), options, false);
    }

    fn declare_view(&mut self, view: String, data: PrimaryData, options: ViewOptions, streaming: bool) {
        self.renderer.declare(PrimaryRender::View {
            view,
            data,
            options,
            streaming,
        });
    }

    /// Validate the task graph, run every task and write the response.
    ///
    /// A rejected task graph answers with the configured error status
    /// before the error is returned. Task failures do not fail the request.
    /// The only error after validation is a failed primary render, reported
    /// once the remaining tasks have drained.
    pub async fn respond(&mut self) -> Result<(), ContextError> {
        if self.responded {
            return Err(ContextError::AlreadyResponded);
        }
        self.responded = true;

        if let Err(err) = self.registry.validate().and_then(|()| self.renderer.validate()) {
            warn!(id = %self.request_id, error = %err, "task graph rejected");
            let status = self.renderer.config().error_status;
            self.out.fail(status, "Internal Server Error").await;
            return Err(err);
        }

        let span = debug_span!(
            "request",
            id = %self.request_id,
            method = %self.out.exchange().method(),
        );
        self.drive().instrument(span).await
    }

    async fn drive(&mut self) -> Result<(), ContextError> {
        self.renderer.start();
        self.runner.seed(&mut self.registry);
        debug!(
            tasks = self.registry.len(),
            fragments = self.renderer.fragments().len(),
            streaming = self.renderer.is_streaming(),
            "responding"
        );

        loop {
            self.runner.drain_ready(&mut self.registry);
            self.renderer.flush(&mut self.out, &self.registry).await;

            let Some((name, result)) = self.runner.next_completion().await else {
                break;
            };
            self.on_task_complete(name, result);
        }

        if !self.out.is_ended() {
            warn!(
                outstanding = self.registry.outstanding(),
                pending_fragments = self.renderer.pending_fragments(),
                "no task left to run; ending response"
            );
            self.out.end(None).await;
        }

        let counts = self.registry.counts();
        debug!(
            succeeded = counts.succeeded,
            failed = counts.failed,
            bytes = self.out.bytes_written(),
            "request finished"
        );

        match self.renderer.take_failure() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn on_task_complete(&mut self, name: TaskName, result: TaskResult) {
        let elapsed = self.registry.get(&name).and_then(|record| record.elapsed());
        match &result {
            Ok(_) => debug!(task = %name, ?elapsed, "task succeeded"),
            Err(err) => warn!(task = %name, ?elapsed, error = %err, "task failed"),
        }
        if !self.registry.complete(&name, result) {
            return;
        }

        for listener in self.notifier.emit_task_complete(&name) {
            match listener {
                Listener::Task(dependent) => {
                    self.runner
                        .on_dependency_complete(&mut self.registry, &dependent);
                }
                Listener::Fragment(id) => self.renderer.fragment_ready(&id, &self.registry),
            }
        }
    }

    pub fn counts(&self) -> TaskCounts {
        self.registry.counts()
    }

    pub fn completion(&self, task: &str) -> Option<&Completion> {
        self.registry.completion(task)
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn exchange(&self) -> &E {
        self.out.exchange()
    }

    pub fn into_exchange(self) -> E {
        self.out.into_inner()
    }
}

/// Returned by `assign`; configures the task just registered.
pub struct TaskHandle<'a, E> {
    ctx: &'a mut RequestContext<E>,
    name: TaskName,
}

impl<E: HttpExchange> TaskHandle<'_, E> {
    pub fn name(&self) -> &TaskName {
        &self.name
    }

    /// Post-process a successful result. Returning `None` or `Some(null)`
    /// keeps the raw value.
    pub fn then<T>(self, transform: T) -> Self
    where
        T: FnOnce(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        if let Some(record) = self.ctx.registry.get_mut(&self.name) {
            record.set_transform(Box::new(transform));
        }
        self
    }

    pub fn render_required(self, flag: impl Into<RenderRequired>) -> Self {
        if let Some(record) = self.ctx.registry.get_mut(&self.name) {
            record.set_render_required(flag.into());
        }
        self
    }

    pub fn pipe(self, view: impl Into<String>, options: PipeOptions) -> Result<Self, ContextError> {
        self.ctx
            .pipe_task(self.name.clone(), view.into(), options)?;
        Ok(self)
    }
}
