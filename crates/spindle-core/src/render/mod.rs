//! Render - primary render と pipe（bigpipe 方式の断片配信）
//!
//! # 構成
//! - **primary**: render_json / render_view の宣言とデータの組み立て
//! - **fragment**: `.pipe(view, options)` で宣言された断片
//! - **renderer**: buffered / streaming の判定と書き込み順序
//! - **output**: HttpExchange への書き込みガード（end は 1 回だけ）
//! - **script**: クライアントへ断片を届ける `<script>` の生成
//!
//! # 設計原則
//! - primary の本文は必ずどの断片よりも先に書く
//! - 断片の render 失敗は空文字列で配信し、レスポンス全体は止めない

pub mod fragment;
pub mod output;
pub mod primary;
pub mod renderer;
pub mod script;

pub use self::fragment::{Fragment, PipeOptions};
pub use self::output::ResponseWriter;
pub use self::primary::{Aggregator, PrimaryData, PrimaryRender};
pub use self::renderer::ProgressiveRenderer;
pub use self::script::Delivery;
