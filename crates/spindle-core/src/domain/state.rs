//! State - タスクの状態
//!
//! # 状態遷移
//! - Waiting: 依存待ち（または respond() 前）
//! - Ready: ready queue に積まれた
//! - Running: work future 実行中
//! - Succeeded / Failed: 確定（以後変化しない）

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Waiting,
    Ready,
    Running,
    Succeeded,
    Failed,
}

/// Per-state counts for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub waiting: usize,
    pub ready: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl TaskCounts {
    pub fn record(&mut self, state: TaskState) {
        match state {
            TaskState::Waiting => self.waiting += 1,
            TaskState::Ready => self.ready += 1,
            TaskState::Running => self.running += 1,
            TaskState::Succeeded => self.succeeded += 1,
            TaskState::Failed => self.failed += 1,
        }
    }

    /// Registered but not yet completed.
    pub fn outstanding(&self) -> usize {
        self.waiting + self.ready + self.running
    }
}
