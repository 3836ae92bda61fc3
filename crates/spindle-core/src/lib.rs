//! spindle-core
//!
//! Per-request task scheduler with progressive ("bigpipe") output.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskName, TaskRecord, Completion, TaskState, FragmentId, TaskError）
//! - **ports**: 抽象化レイヤー（HttpExchange, ViewRenderer）
//! - **scheduler**: registry / notifier / runner（依存解決と実行）
//! - **render**: primary render と pipe 断片の書き込み
//! - **context**: 公開 API（RequestContext, TaskHandle）
//! - **config**: RendererConfig
//! - **impls**: 実装（MemoryExchange, ChannelExchange, HandlebarsViews）

pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod render;
pub mod scheduler;

// 主要な型を再エクスポート
pub use self::config::RendererConfig;
pub use self::context::{RequestContext, TaskHandle};
pub use self::domain::{
    Completion, Completions, Dependencies, FragmentId, RenderRequired, TaskCounts, TaskError,
    TaskName, TaskResult, TaskState,
};
pub use self::error::ContextError;
pub use self::ports::{Format, HttpExchange, NoViews, RenderError, TransportError, ViewOptions, ViewRenderer};
pub use self::render::PipeOptions;
