//! サービス有効化条件とグローバル設定

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// グローバル設定
///
/// サービスの有効化条件が参照する値。リゾルバへは必ずこの値を
/// 明示的に渡す（グローバル状態からの暗黙の読み出しはしない）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// イベントストリームのバックエンド名（例: "snuba", "kafka", "dummy"）
    pub event_stream: String,
    /// キャッシュのバックエンド名（例: "redis", "memcached"）
    pub cache_backend: String,
    /// 機能フラグ（例: "symbolicator.enabled"）
    #[serde(default)]
    pub options: BTreeMap<String, bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            event_stream: "snuba".to_string(),
            cache_backend: "redis".to_string(),
            options: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// 環境変数から設定を組み立てる
    pub fn from_env() -> Self {
        let mut options = BTreeMap::new();
        options.insert(
            "symbolicator.enabled".to_string(),
            env_flag("SENTRY_SYMBOLICATOR_ENABLED"),
        );
        options.insert("relay.enabled".to_string(), env_flag("SENTRY_USE_RELAY"));

        Self {
            event_stream: env_or("SENTRY_EVENTSTREAM", "snuba"),
            cache_backend: env_or("SENTRY_CACHE", "redis"),
            options,
        }
    }

    /// 機能フラグの状態。未定義は無効扱い
    pub fn option_enabled(&self, key: &str) -> bool {
        self.options.get(key).copied().unwrap_or(false)
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// サービス有効化条件
///
/// 実行可能な値ではなく、組み込み条件の列挙としてデータのまま持つ。
///
/// YAML形式：
/// ```yaml
/// only_if: always
/// only_if:
///   event_stream_in: [kafka, snuba]
/// only_if:
///   option_enabled: "symbolicator.enabled"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// 常に有効
    #[default]
    Always,
    /// イベントストリームのバックエンド名にいずれかが含まれる
    EventStreamIn(Vec<String>),
    /// キャッシュのバックエンド名に部分文字列が含まれる
    CacheContains(String),
    /// 機能フラグが有効
    OptionEnabled(String),
}

impl Condition {
    /// 設定に対して条件を評価する
    pub fn evaluate(&self, settings: &Settings) -> bool {
        match self {
            Condition::Always => true,
            Condition::EventStreamIn(backends) => backends
                .iter()
                .any(|backend| settings.event_stream.contains(backend.as_str())),
            Condition::CacheContains(backend) => {
                settings.cache_backend.contains(backend.as_str())
            }
            Condition::OptionEnabled(key) => settings.option_enabled(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_condition() {
        assert!(Condition::Always.evaluate(&Settings::default()));
    }

    #[test]
    fn test_event_stream_in() {
        let condition =
            Condition::EventStreamIn(vec!["kafka".to_string(), "snuba".to_string()]);

        // デフォルトのバックエンドはsnuba
        assert!(condition.evaluate(&Settings::default()));

        let kafka = Settings {
            event_stream: "kafka".to_string(),
            ..Default::default()
        };
        assert!(condition.evaluate(&kafka));

        let dummy = Settings {
            event_stream: "dummy".to_string(),
            ..Default::default()
        };
        assert!(!condition.evaluate(&dummy));
    }

    #[test]
    fn test_cache_contains() {
        let condition = Condition::CacheContains("memcached".to_string());

        assert!(!condition.evaluate(&Settings::default()));

        let memcached = Settings {
            cache_backend: "memcached".to_string(),
            ..Default::default()
        };
        assert!(condition.evaluate(&memcached));
    }

    #[test]
    fn test_option_enabled() {
        let condition = Condition::OptionEnabled("symbolicator.enabled".to_string());

        // 未定義のフラグは無効扱い
        assert!(!condition.evaluate(&Settings::default()));

        let mut settings = Settings::default();
        settings
            .options
            .insert("symbolicator.enabled".to_string(), true);
        assert!(condition.evaluate(&settings));
    }

    #[test]
    fn test_settings_from_env() {
        temp_env::with_vars(
            [
                ("SENTRY_EVENTSTREAM", Some("kafka")),
                ("SENTRY_CACHE", Some("memcached")),
                ("SENTRY_USE_RELAY", Some("1")),
            ],
            || {
                let settings = Settings::from_env();
                assert_eq!(settings.event_stream, "kafka");
                assert_eq!(settings.cache_backend, "memcached");
                assert!(settings.option_enabled("relay.enabled"));
                assert!(!settings.option_enabled("symbolicator.enabled"));
            },
        );
    }

    #[test]
    fn test_settings_from_env_defaults() {
        temp_env::with_vars(
            [
                ("SENTRY_EVENTSTREAM", None::<&str>),
                ("SENTRY_CACHE", None),
            ],
            || {
                let settings = Settings::from_env();
                assert_eq!(settings.event_stream, "snuba");
                assert_eq!(settings.cache_backend, "redis");
            },
        );
    }

    #[test]
    fn test_condition_from_yaml() {
        let always: Condition = serde_yaml::from_str("always").unwrap();
        assert_eq!(always, Condition::Always);

        let event_stream: Condition =
            serde_yaml::from_str("event_stream_in: [kafka, snuba]").unwrap();
        assert_eq!(
            event_stream,
            Condition::EventStreamIn(vec!["kafka".to_string(), "snuba".to_string()])
        );

        let option: Condition =
            serde_yaml::from_str("option_enabled: relay.enabled").unwrap();
        assert_eq!(option, Condition::OptionEnabled("relay.enabled".to_string()));
    }
}
