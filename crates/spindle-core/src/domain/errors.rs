//! Errors - タスク実行エラー
//!
//! TaskError は Completion に保存されるため `Clone` が必要です。
//! 依存先の失敗は dependents にそのまま渡され、致命的かどうかは受け取った側が判断します。

use std::fmt;

use serde::Serialize;

/// Failure of one task's work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum TaskError {
    /// The work function resolved to an error.
    #[error("{0}")]
    Failed(String),

    /// The work function panicked while being built or polled.
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn new(message: impl fmt::Display) -> Self {
        TaskError::Failed(message.to_string())
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        TaskError::Failed(format!("json: {err}"))
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        TaskError::Failed(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        TaskError::Failed(message.to_string())
    }
}
