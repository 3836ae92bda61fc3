//! DependencyNotifier - 完了イベントの pub/sub
//!
//! Listeners are plain data rather than closures: the driver decides what a
//! firing means (start a dependent, render a fragment). A dependent task is
//! subscribed once to *each* of its dependencies, so out-of-order completions
//! converge on the same fan-in check regardless of arrival order.

use std::collections::HashMap;

use crate::domain::{FragmentId, TaskName};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Listener {
    /// A task waiting on the completed one.
    Task(TaskName),
    /// A piped fragment bound to the completed task.
    Fragment(FragmentId),
}

#[derive(Debug, Default)]
pub struct DependencyNotifier {
    listeners: HashMap<TaskName, Vec<Listener>>,
}

impl DependencyNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to the completion of `task`. Duplicates are ignored.
    pub fn on_task_complete(&mut self, task: TaskName, listener: Listener) {
        let entry = self.listeners.entry(task).or_default();
        if !entry.contains(&listener) {
            entry.push(listener);
        }
    }

    /// Subscribe `dependent` to every one of its dependencies.
    pub fn subscribe_dependencies(&mut self, dependent: &TaskName, dependencies: &[TaskName]) {
        for dep in dependencies {
            self.on_task_complete(dep.clone(), Listener::Task(dependent.clone()));
        }
    }

    /// Raise the completion event of `task` and return its listeners in
    /// subscription order. Every call returns the full list; receivers must
    /// tolerate being fired more than once.
    pub fn emit_task_complete(&self, task: &TaskName) -> Vec<Listener> {
        self.listeners(task).to_vec()
    }

    pub fn listeners(&self, task: &str) -> &[Listener] {
        self.listeners.get(task).map(Vec::as_slice).unwrap_or(&[])
    }
}
