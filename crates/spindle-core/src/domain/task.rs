use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::time::Instant;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::completion::{Completion, Completions};
use super::errors::TaskError;
use super::state::TaskState;

/// Name of a task, unique within one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskName(String);

impl TaskName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Deref for TaskName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TaskName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&TaskName> for TaskName {
    fn from(name: &TaskName) -> Self {
        name.clone()
    }
}

/// Whether a task's result takes part in the primary (buffered) render.
///
/// - `Required`: the primary render always waits for it.
/// - `Deferred`: never delays the primary render; only pipes consume it.
/// - `Auto`: waits for it unless the response streams and a pipe is bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderRequired {
    Required,
    Deferred,
    #[default]
    Auto,
}

impl From<bool> for RenderRequired {
    fn from(required: bool) -> Self {
        if required {
            RenderRequired::Required
        } else {
            RenderRequired::Deferred
        }
    }
}

impl From<Option<bool>> for RenderRequired {
    fn from(required: Option<bool>) -> Self {
        required.map(Self::from).unwrap_or_default()
    }
}

/// What a work function resolves to.
pub type TaskResult = Result<serde_json::Value, TaskError>;

/// User work: receives the completion snapshot of its dependencies.
///
/// `Sync` so that the registry can be shared across the driver's awaits.
pub type WorkFn = Box<dyn FnOnce(Completions) -> BoxFuture<'static, TaskResult> + Send + Sync>;

/// Post-processing attached with `.then(..)`. `None` or `Some(null)` keeps
/// the raw result.
pub type ResultTransform =
    Box<dyn FnOnce(&serde_json::Value) -> Option<serde_json::Value> + Send + Sync>;

/// One registered task and everything the scheduler tracks about it.
pub struct TaskRecord {
    name: TaskName,
    dependencies: Vec<TaskName>,
    render_required: RenderRequired,
    state: TaskState,
    completion: Option<Completion>,
    work: Option<WorkFn>,
    transform: Option<ResultTransform>,
    started_at: Option<Instant>,
}

impl TaskRecord {
    pub fn new(
        name: TaskName,
        dependencies: Vec<TaskName>,
        work: WorkFn,
        render_required: RenderRequired,
    ) -> Self {
        Self {
            name,
            dependencies,
            render_required,
            state: TaskState::Waiting,
            completion: None,
            work: Some(work),
            transform: None,
            started_at: None,
        }
    }

    pub fn name(&self) -> &TaskName {
        &self.name
    }

    pub fn dependencies(&self) -> &[TaskName] {
        &self.dependencies
    }

    pub fn render_required(&self) -> RenderRequired {
        self.render_required
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.completion.is_some()
    }

    pub fn set_render_required(&mut self, flag: RenderRequired) {
        self.render_required = flag;
    }

    pub fn set_transform(&mut self, transform: ResultTransform) {
        self.transform = Some(transform);
    }

    pub(crate) fn mark_ready(&mut self) {
        if self.state == TaskState::Waiting {
            self.state = TaskState::Ready;
        }
    }

    /// Hands the work function to the runner. Returns `None` once it was taken.
    pub(crate) fn start(&mut self) -> Option<WorkFn> {
        let work = self.work.take()?;
        self.state = TaskState::Running;
        self.started_at = Some(Instant::now());
        Some(work)
    }

    /// Stores the completion. Later calls are ignored and return `false`.
    pub(crate) fn complete(&mut self, result: TaskResult) -> bool {
        if self.completion.is_some() {
            return false;
        }
        let completion = match result {
            Ok(raw) => {
                // transform が None / null を返したら生の結果を保存する
                let data = self
                    .transform
                    .take()
                    .and_then(|transform| transform(&raw))
                    .filter(|data| !data.is_null())
                    .unwrap_or(raw);
                self.state = TaskState::Succeeded;
                Completion::Succeeded(data)
            }
            Err(err) => {
                self.state = TaskState::Failed;
                Completion::Failed(err)
            }
        };
        self.completion = Some(completion);
        true
    }

    /// Time since the work function was started.
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        self.started_at.map(|t| t.elapsed())
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("render_required", &self.render_required)
            .field("state", &self.state)
            .field("completion", &self.completion)
            .field("has_transform", &self.transform.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    fn noop_work() -> WorkFn {
        Box::new(|_deps: Completions| async { Ok(json!(null)) }.boxed())
    }

    #[test]
    fn render_required_from_flags() {
        assert_eq!(RenderRequired::from(true), RenderRequired::Required);
        assert_eq!(RenderRequired::from(false), RenderRequired::Deferred);
        assert_eq!(RenderRequired::from(None::<bool>), RenderRequired::Auto);
    }

    #[test]
    fn complete_is_set_once() {
        let mut record = TaskRecord::new("a".into(), vec![], noop_work(), RenderRequired::Auto);
        assert!(record.complete(Ok(json!(1))));
        assert!(!record.complete(Ok(json!(2))));
        assert!(!record.complete(Err(TaskError::new("late"))));
        assert_eq!(record.completion(), Some(&Completion::Succeeded(json!(1))));
        assert_eq!(record.state(), TaskState::Succeeded);
    }

    #[test]
    fn transform_replaces_data_unless_it_returns_none() {
        let mut kept = TaskRecord::new("a".into(), vec![], noop_work(), RenderRequired::Auto);
        kept.set_transform(Box::new(|_raw| None));
        kept.complete(Ok(json!({"id": 1})));
        assert_eq!(kept.completion().and_then(Completion::data), Some(&json!({"id": 1})));

        let mut replaced = TaskRecord::new("b".into(), vec![], noop_work(), RenderRequired::Auto);
        replaced.set_transform(Box::new(|raw| Some(json!({"wrapped": raw.clone()}))));
        replaced.complete(Ok(json!(7)));
        assert_eq!(
            replaced.completion().and_then(Completion::data),
            Some(&json!({"wrapped": 7}))
        );
    }

    #[test]
    fn transform_returning_null_keeps_raw_data() {
        let mut record = TaskRecord::new("a".into(), vec![], noop_work(), RenderRequired::Auto);
        record.set_transform(Box::new(|_raw| Some(serde_json::Value::Null)));
        record.complete(Ok(json!({"raw": 1})));
        assert_eq!(record.completion().and_then(Completion::data), Some(&json!({"raw": 1})));
    }

    #[test]
    fn work_is_taken_once() {
        let mut record = TaskRecord::new("a".into(), vec![], noop_work(), RenderRequired::Auto);
        assert!(record.start().is_some());
        assert_eq!(record.state(), TaskState::Running);
        assert!(record.start().is_none());
    }
}
