//! Scheduler - リクエスト単位のタスク依存スケジューラ
//!
//! # 構成
//! - **registry**: task 名 → TaskRecord（依存・結果・render_required）
//! - **graph**: 依存グラフの検証（未知の依存・循環）
//! - **notifier**: 完了イベントの pub/sub（依存タスクと fragment を起こす）
//! - **runner**: ready queue と実行中 future の管理
//!
//! # 設計原則
//! - 登録フェーズでは何も実行しない。respond() で ready queue を初めて drain する
//! - 状態は 1 リクエストの driver だけが触る（ロック不要）

pub mod graph;
pub mod notifier;
pub mod registry;
pub mod runner;

pub use self::graph::DependencyGraph;
pub use self::notifier::{DependencyNotifier, Listener};
pub use self::registry::TaskRegistry;
pub use self::runner::TaskRunner;
