//! devservices のコアモデルとオプションリゾルバ
//!
//! サービスレジストリの定義・ロード、グローバル設定、
//! レジストリから解決済みコンテナオプションへの純粋な変換を提供します。
//! Docker への依存はここには置きません。

pub mod error;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod template;

pub use error::{DevServiceError, Result};
pub use model::*;
pub use registry::{Registry, load_registry};
pub use resolver::{
    ResolvedService, ResolvedSet, container_name, name_prefix, resolve, volume_name,
};
pub use template::interpolate;
