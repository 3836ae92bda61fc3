use thiserror::Error;

use crate::domain::{FragmentId, TaskName};
use crate::ports::RenderError;

/// Misuse of the task API, an invalid task graph, or a failed primary render.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("task name must not be empty")]
    EmptyTaskName,

    #[error("duplicate task name={0}")]
    DuplicateTask(TaskName),

    #[error("task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: TaskName, dependency: TaskName },

    #[error("dependency cycle: {}", format_cycle(.0))]
    DependencyCycle(Vec<TaskName>),

    #[error("pipe declared before any task was registered")]
    PipeWithoutTask,

    #[error("duplicate fragment id={0}")]
    DuplicateFragment(FragmentId),

    #[error("pipes cannot stream into a JSON response")]
    PipeOnJsonResponse,

    #[error("respond() was already called for this request")]
    AlreadyResponded,

    #[error("primary render failed: {0}")]
    Render(#[from] RenderError),
}

fn format_cycle(path: &[TaskName]) -> String {
    path.iter()
        .map(TaskName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
