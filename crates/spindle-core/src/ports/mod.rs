//! Ports - 外部コラボレータとの境界
//!
//! スケジューラ本体は HTTP の転送やテンプレートの詳細を知りません。
//! ここで定義する trait だけを通して外部とやり取りします。
//!
//! - **HttpExchange**: レスポンスの書き込み・ステータス・ヘッダ
//! - **ViewRenderer**: view 名 + データ → マークアップ

pub mod exchange;
pub mod view;

pub use self::exchange::{HttpExchange, TransportError};
pub use self::view::{Format, NoViews, RenderError, ViewOptions, ViewRenderer};
