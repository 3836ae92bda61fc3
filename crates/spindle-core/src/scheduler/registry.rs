//! TaskRegistry - タスクの登録と結果の保存
//!
//! Pure data + lookup. The registry never runs anything: the runner takes the
//! work function out of a record and reports the result back via `complete`.

use std::collections::HashMap;

use tracing::warn;

use crate::domain::{
    Completion, Completions, RenderRequired, TaskCounts, TaskName, TaskRecord,
    TaskResult, WorkFn,
};
use crate::error::ContextError;

use super::graph::DependencyGraph;

#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskName, TaskRecord>,
    /// Registration order, used to seed the ready queue deterministically.
    order: Vec<TaskName>,
    outstanding: usize,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Names must be non-empty and unique within the request.
    pub fn register(
        &mut self,
        name: TaskName,
        dependencies: Vec<TaskName>,
        work: WorkFn,
        render_required: RenderRequired,
    ) -> Result<(), ContextError> {
        if name.is_empty() {
            return Err(ContextError::EmptyTaskName);
        }
        if self.tasks.contains_key(&name) {
            return Err(ContextError::DuplicateTask(name));
        }

        let mut deps: Vec<TaskName> = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }

        let record = TaskRecord::new(name.clone(), deps, work, render_required);
        self.tasks.insert(name.clone(), record);
        self.order.push(name);
        self.outstanding += 1;
        Ok(())
    }

    /// Store the result of a finished task.
    ///
    /// Returns `false` when the task is unknown or already complete; the stored
    /// completion is never replaced.
    pub fn complete(&mut self, name: &str, result: TaskResult) -> bool {
        let Some(record) = self.tasks.get_mut(name) else {
            warn!(task = name, "completion for unknown task ignored");
            return false;
        };
        if !record.complete(result) {
            warn!(task = name, "task completed twice; keeping the first result");
            return false;
        }
        self.outstanding -= 1;
        true
    }

    pub fn get(&self, name: &str) -> Option<&TaskRecord> {
        self.tasks.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut TaskRecord> {
        self.tasks.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &TaskName> {
        self.order.iter()
    }

    /// Records in registration order.
    pub fn records(&self) -> impl Iterator<Item = &TaskRecord> {
        self.order.iter().filter_map(|name| self.tasks.get(name))
    }

    pub fn completion(&self, name: &str) -> Option<&Completion> {
        self.get(name).and_then(TaskRecord::completion)
    }

    pub fn is_complete(&self, name: &str) -> bool {
        self.completion(name).is_some()
    }

    /// Idempotent readiness check: re-scans every name on each call.
    pub fn all_complete<'a>(&self, names: impl IntoIterator<Item = &'a TaskName>) -> bool {
        names.into_iter().all(|name| self.is_complete(name))
    }

    /// Current completions of `names`. Pending tasks are left out.
    pub fn snapshot<'a>(&self, names: impl IntoIterator<Item = &'a TaskName>) -> Completions {
        names
            .into_iter()
            .filter_map(|name| Some((name.clone(), self.completion(name)?.clone())))
            .collect()
    }

    /// Registered but not yet completed.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn counts(&self) -> TaskCounts {
        let mut counts = TaskCounts::default();
        for record in self.tasks.values() {
            counts.record(record.state());
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for record in self.records() {
            graph.add_task(record.name().clone());
            for dep in record.dependencies() {
                graph.add_dependency(record.name().clone(), dep.clone());
            }
        }
        graph
    }

    /// Reject unknown dependency names and cycles before anything runs.
    pub fn validate(&self) -> Result<(), ContextError> {
        for record in self.records() {
            if let Some(missing) = record.dependencies().iter().find(|d| !self.contains(d)) {
                return Err(ContextError::UnknownDependency {
                    task: record.name().clone(),
                    dependency: missing.clone(),
                });
            }
        }
        match self.graph().detect_cycle() {
            Some(cycle) => Err(ContextError::DependencyCycle(cycle)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskError, TaskState};
    use futures::FutureExt;
    use serde_json::json;

    fn work() -> WorkFn {
        Box::new(|_deps: Completions| async { Ok(json!(null)) }.boxed())
    }

    fn names(list: &[&str]) -> Vec<TaskName> {
        list.iter().map(|n| TaskName::from(*n)).collect()
    }

    #[test]
    fn register_counts_outstanding() {
        let mut reg = TaskRegistry::new();
        reg.register("a".into(), vec![], work(), RenderRequired::Auto).unwrap();
        reg.register("b".into(), names(&["a"]), work(), RenderRequired::Deferred).unwrap();

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.outstanding(), 2);
        assert_eq!(reg.get("b").unwrap().render_required(), RenderRequired::Deferred);
        assert_eq!(reg.names().map(TaskName::as_str).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn duplicate_and_empty_names_are_rejected() {
        let mut reg = TaskRegistry::new();
        reg.register("a".into(), vec![], work(), RenderRequired::Auto).unwrap();

        let err = reg.register("a".into(), vec![], work(), RenderRequired::Auto).unwrap_err();
        assert!(matches!(err, ContextError::DuplicateTask(n) if n.as_str() == "a"));

        let err = reg.register("".into(), vec![], work(), RenderRequired::Auto).unwrap_err();
        assert!(matches!(err, ContextError::EmptyTaskName));
        assert_eq!(reg.outstanding(), 1);
    }

    #[test]
    fn repeated_dependencies_are_collapsed() {
        let mut reg = TaskRegistry::new();
        reg.register("a".into(), vec![], work(), RenderRequired::Auto).unwrap();
        reg.register("b".into(), names(&["a", "a"]), work(), RenderRequired::Auto).unwrap();
        assert_eq!(reg.get("b").unwrap().dependencies(), &names(&["a"])[..]);
    }

    #[test]
    fn completion_is_idempotent() {
        let mut reg = TaskRegistry::new();
        reg.register("a".into(), vec![], work(), RenderRequired::Auto).unwrap();

        assert!(reg.complete("a", Ok(json!({"id": 1}))));
        assert!(!reg.complete("a", Err(TaskError::new("second"))));
        assert!(!reg.complete("a", Ok(json!({"id": 2}))));

        assert_eq!(reg.completion("a"), Some(&Completion::Succeeded(json!({"id": 1}))));
        assert_eq!(reg.outstanding(), 0);
    }

    #[test]
    fn completing_unknown_task_is_ignored() {
        let mut reg = TaskRegistry::new();
        assert!(!reg.complete("ghost", Ok(json!(1))));
        assert_eq!(reg.outstanding(), 0);
    }

    #[test]
    fn snapshot_only_holds_completed_tasks() {
        let mut reg = TaskRegistry::new();
        reg.register("a".into(), vec![], work(), RenderRequired::Auto).unwrap();
        reg.register("b".into(), vec![], work(), RenderRequired::Auto).unwrap();
        reg.complete("a", Ok(json!(1)));

        let deps = names(&["a", "b"]);
        assert!(!reg.all_complete(&deps));
        let snap = reg.snapshot(&deps);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.data("a"), Some(&json!(1)));

        reg.complete("b", Err(TaskError::new("x")));
        assert!(reg.all_complete(&deps));
    }

    #[test]
    fn counts_follow_states() {
        let mut reg = TaskRegistry::new();
        reg.register("a".into(), vec![], work(), RenderRequired::Auto).unwrap();
        reg.register("b".into(), vec![], work(), RenderRequired::Auto).unwrap();
        reg.register("c".into(), vec![], work(), RenderRequired::Auto).unwrap();
        reg.complete("a", Ok(json!(1)));
        reg.complete("b", Err(TaskError::new("x")));

        let counts = reg.counts();
        assert_eq!(counts.succeeded, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.waiting, 1);
        assert_eq!(counts.outstanding(), reg.outstanding());
        assert_eq!(reg.get("c").unwrap().state(), TaskState::Waiting);
    }

    #[test]
    fn validate_rejects_unknown_dependency() {
        let mut reg = TaskRegistry::new();
        reg.register("page".into(), names(&["user"]), work(), RenderRequired::Auto).unwrap();

        let err = reg.validate().unwrap_err();
        assert!(matches!(
            err,
            ContextError::UnknownDependency { task, dependency }
                if task.as_str() == "page" && dependency.as_str() == "user"
        ));
    }

    #[test]
    fn validate_rejects_cycles() {
        let mut reg = TaskRegistry::new();
        reg.register("a".into(), names(&["b"]), work(), RenderRequired::Auto).unwrap();
        reg.register("b".into(), names(&["a"]), work(), RenderRequired::Auto).unwrap();

        assert!(matches!(reg.validate(), Err(ContextError::DependencyCycle(_))));
    }

}
