//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **MemoryExchange**: チャンクを記録するテスト / デモ用の HttpExchange
//! - **ChannelExchange**: mpsc チャネルにボディを流す HttpExchange（サーバ組み込み用）
//! - **HandlebarsViews**: 名前付きテンプレートの ViewRenderer（feature `handlebars`）

pub mod channel_exchange;
#[cfg(feature = "handlebars")]
pub mod handlebars_views;
pub mod memory_exchange;

pub use self::channel_exchange::{ChannelExchange, ChannelFrame};
#[cfg(feature = "handlebars")]
pub use self::handlebars_views::HandlebarsViews;
pub use self::memory_exchange::MemoryExchange;
