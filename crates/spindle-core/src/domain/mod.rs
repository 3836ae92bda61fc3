//! Domain model - リクエスト単位のタスクとその結果
//!
//! - **task**: TaskName, TaskRecord, RenderRequired, work / transform 関数の型
//! - **completion**: Completion（成功 / 失敗の確定結果）と Completions（スナップショット）
//! - **state**: TaskState と TaskCounts（観測用）
//! - **errors**: TaskError（Completion に保存されるエラー）
//! - **fragment**: FragmentId（pipe で流す断片の識別子）

pub mod completion;
pub mod errors;
pub mod fragment;
pub mod state;
pub mod task;

pub use self::completion::{Completion, Completions, Dependencies};
pub use self::errors::TaskError;
pub use self::fragment::FragmentId;
pub use self::state::{TaskCounts, TaskState};
pub use self::task::{RenderRequired, ResultTransform, TaskName, TaskRecord, TaskResult, WorkFn};
