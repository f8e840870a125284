//! ポート定義

use serde::{Deserialize, Serialize};

/// インターフェース未指定時のデフォルト
///
/// 素のポート番号はループバックにのみ束縛する。開発マシンの
/// サービスを全インターフェースへ誤って公開しないための既定値。
pub const DEFAULT_INTERFACE: &str = "127.0.0.1";

/// レジストリ上のポート指定
///
/// YAML形式：
/// ```yaml
/// ports:
///   5432: 5432                  # ループバックに束縛
///   9092: ["0.0.0.0", 9092]     # インターフェースを明示
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortSpec {
    /// 素のホストポート番号
    Plain(u16),
    /// (ホストインターフェース, ホストポート) の明示指定
    Bound(String, u16),
}

/// 正規化済みのホストバインディング
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub host_ip: String,
    pub host_port: u16,
}

impl PortSpec {
    /// 明示的な (インターフェース, ポート) の組へ正規化する
    pub fn ensure_interface(&self) -> PortBinding {
        match self {
            PortSpec::Plain(port) => PortBinding {
                host_ip: DEFAULT_INTERFACE.to_string(),
                host_port: *port,
            },
            PortSpec::Bound(host_ip, port) => PortBinding {
                host_ip: host_ip.clone(),
                host_port: *port,
            },
        }
    }
}

impl std::fmt::Display for PortBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host_ip, self.host_port)
    }
}
