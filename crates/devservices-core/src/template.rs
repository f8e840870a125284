//! 環境変数テンプレート展開
//!
//! 環境変数の値に含まれる、他サービスの解決済みオプションを参照する
//! トークンを展開します。対応形式:
//! - `{containers[<service>][name]}` → コンテナ名
//! - `{containers[<service>][ports][<port>]}` → ホスト側ポート

use crate::resolver::ResolvedSet;
use regex::Regex;
use tracing::warn;

/// テンプレートトークンを解決済みオプションで置換する
///
/// 未知のサービスやポートを参照するトークンは展開せずそのまま残す。
pub fn interpolate(value: &str, containers: &ResolvedSet) -> String {
    let name_pattern = Regex::new(r"\{containers\[([\w-]+)\]\[name\]\}").unwrap();
    let port_pattern = Regex::new(r"\{containers\[([\w-]+)\]\[ports\]\[(\d+)\]\}").unwrap();

    let result = name_pattern.replace_all(value, |caps: &regex::Captures| {
        match containers.get(&caps[1]) {
            Some(resolved) => resolved.container_name.clone(),
            None => {
                warn!(service = &caps[1], "Unknown service referenced in environment template");
                caps[0].to_string()
            }
        }
    });

    let result = port_pattern.replace_all(&result, |caps: &regex::Captures| {
        let binding = containers
            .get(&caps[1])
            .zip(caps[2].parse::<u16>().ok())
            .and_then(|(resolved, port)| resolved.ports.get(&port));
        match binding {
            Some(binding) => binding.host_port.to_string(),
            None => {
                warn!(
                    service = &caps[1],
                    port = &caps[2],
                    "Unknown port referenced in environment template"
                );
                caps[0].to_string()
            }
        }
    });

    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PortSpec, ServiceSpec, Settings};
    use crate::registry::Registry;
    use crate::resolver::resolve;
    use std::collections::BTreeMap;

    fn resolved_set() -> ResolvedSet {
        let mut registry = Registry::new();
        registry.insert(
            "kafka",
            ServiceSpec {
                image: Some("confluentinc/cp-kafka:5.1.2".to_string()),
                ports: BTreeMap::from([(9092, PortSpec::Plain(9092))]),
                ..Default::default()
            },
        );
        resolve(&registry, &Settings::default(), "sentry").unwrap()
    }

    #[test]
    fn test_interpolate_container_name() {
        let containers = resolved_set();
        assert_eq!(
            interpolate("{containers[kafka][name]}:9093", &containers),
            "sentry_kafka:9093"
        );
    }

    #[test]
    fn test_interpolate_host_port() {
        let containers = resolved_set();
        assert_eq!(
            interpolate("127.0.0.1:{containers[kafka][ports][9092]}", &containers),
            "127.0.0.1:9092"
        );
    }

    #[test]
    fn test_interpolate_multiple_tokens() {
        let containers = resolved_set();
        assert_eq!(
            interpolate(
                "INTERNAL://{containers[kafka][name]}:9093,EXTERNAL://127.0.0.1:{containers[kafka][ports][9092]}",
                &containers
            ),
            "INTERNAL://sentry_kafka:9093,EXTERNAL://127.0.0.1:9092"
        );
    }

    #[test]
    fn test_unknown_tokens_left_as_is() {
        let containers = resolved_set();

        // 未知のサービス
        assert_eq!(
            interpolate("{containers[nope][name]}", &containers),
            "{containers[nope][name]}"
        );
        // 未知のポート
        assert_eq!(
            interpolate("{containers[kafka][ports][1234]}", &containers),
            "{containers[kafka][ports][1234]}"
        );
    }

    #[test]
    fn test_plain_values_untouched() {
        let containers = resolved_set();
        assert_eq!(interpolate("plain-value", &containers), "plain-value");
        assert_eq!(interpolate("", &containers), "");
    }
}
