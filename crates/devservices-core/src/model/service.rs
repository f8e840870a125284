//! サービス定義

use super::condition::Condition;
use super::port::PortSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// サービス定義
///
/// YAML形式（devservices.yml オーバーライド）：
/// ```yaml
/// postgres:
///   image: "postgres:9.6-alpine"
///   ports: {5432: 5432}
///   environment:
///     POSTGRES_DB: sentry
///   volumes: {postgres: "/var/lib/postgresql/data"}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSpec {
    /// コンテナイメージ。解決時点では必須だが、オーバーライド定義が
    /// フィールド単位でマージできるようOptionで持つ
    pub image: Option<String>,
    /// コンテナのコマンド上書き
    pub command: Option<Vec<String>>,
    /// コンテナポート → ホストバインディング
    pub ports: BTreeMap<u16, PortSpec>,
    /// 環境変数。値は他サービスの解決済みオプションを参照する
    /// テンプレートトークンを含んでよい
    pub environment: BTreeMap<String, String>,
    /// マウント名 → コンテナ内パス。パス区切りを含まないマウント名は
    /// 作成を要する名前付きボリューム
    pub volumes: BTreeMap<String, String>,
    /// 再起動ポリシー。未指定は on-failure
    pub restart: Option<RestartPolicy>,
    /// 毎回イメージをpullする
    pub pull: bool,
    /// 起動をdevserverからのattachまで遅延する
    pub with_devserver: bool,
    /// 有効化条件
    pub only_if: Condition,
}

/// 再起動ポリシー
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// 再起動しない
    No,
    /// 常に再起動
    Always,
    /// 異常終了時のみ再起動（デフォルト）
    #[default]
    OnFailure,
    /// 明示的に停止しない限り再起動
    UnlessStopped,
}

impl RestartPolicy {
    /// 文字列からパース
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "no" => Some(Self::No),
            "always" => Some(Self::Always),
            "on-failure" | "on_failure" => Some(Self::OnFailure),
            "unless-stopped" | "unless_stopped" => Some(Self::UnlessStopped),
            _ => None,
        }
    }

    /// Docker APIで使用する文字列に変換
    pub fn as_docker_str(&self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Always => "always",
            Self::OnFailure => "on-failure",
            Self::UnlessStopped => "unless-stopped",
        }
    }
}

impl ServiceSpec {
    /// 他のServiceSpecをマージする
    ///
    /// otherで定義されたフィールドが優先される（オーバーライド）。
    /// - Option<T>: otherがSomeならそれを使用、Noneなら元の値を維持
    /// - BTreeMap<K, V>: 元の値にotherの値をマージ（otherが優先）
    /// - bool: otherがtrueなら立てる
    /// - only_if: otherがAlways以外ならそれを使用
    pub fn merge(&mut self, other: ServiceSpec) {
        if other.image.is_some() {
            self.image = other.image;
        }
        if other.command.is_some() {
            self.command = other.command;
        }
        if other.restart.is_some() {
            self.restart = other.restart;
        }
        if other.pull {
            self.pull = true;
        }
        if other.with_devserver {
            self.with_devserver = true;
        }
        if other.only_if != Condition::Always {
            self.only_if = other.only_if;
        }

        for (key, value) in other.ports {
            self.ports.insert(key, value);
        }
        for (key, value) in other.environment {
            self.environment.insert(key, value);
        }
        for (key, value) in other.volumes {
            self.volumes.insert(key, value);
        }
    }
}
