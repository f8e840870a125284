//! サービスレジストリ
//!
//! 組み込みのサービス定義と、devservices.yml によるローカル
//! オーバーライドのロード・マージを提供します。

use crate::error::{DevServiceError, Result};
use crate::model::{Condition, PortSpec, ServiceSpec};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// オーバーライドファイルの名前
pub const OVERRIDE_FILE: &str = "devservices.yml";

/// 宣言順を保持するサービスレジストリ
///
/// 起動順は定義順に従う。依存があるサービスはレジストリ上で
/// 依存先の後に置く（zookeeper → kafka → snuba）。
#[derive(Debug, Clone, Default)]
pub struct Registry {
    services: Vec<(String, ServiceSpec)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// サービスを登録する。同名の既存エントリは置き換え（位置は維持）
    pub fn insert(&mut self, name: impl Into<String>, spec: ServiceSpec) {
        let name = name.into();
        if let Some(entry) = self.services.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = spec;
        } else {
            self.services.push((name, spec));
        }
    }

    pub fn get(&self, name: &str) -> Option<&ServiceSpec> {
        self.services
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }

    /// 定義順のイテレータ
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceSpec)> {
        self.services.iter().map(|(n, spec)| (n.as_str(), spec))
    }

    /// 定義順のサービス名
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// 他レジストリをエントリ単位でマージする
    ///
    /// 既存エントリはフィールド単位でマージ、新規エントリは末尾に追加。
    pub fn merge(&mut self, other: Registry) {
        for (name, spec) in other.services {
            if let Some(entry) = self.services.iter_mut().find(|(n, _)| *n == name) {
                entry.1.merge(spec);
            } else {
                self.services.push((name, spec));
            }
        }
    }
}

// YAMLのマッピング順をそのまま定義順として取り込む
impl<'de> Deserialize<'de> for Registry {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RegistryVisitor;

        impl<'de> Visitor<'de> for RegistryVisitor {
            type Value = Registry;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of service name to service spec")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Registry, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut registry = Registry::new();
                while let Some((name, spec)) = access.next_entry::<String, ServiceSpec>()? {
                    registry.insert(name, spec);
                }
                Ok(registry)
            }
        }

        deserializer.deserialize_map(RegistryVisitor)
    }
}

/// レジストリをロードする
///
/// 組み込み定義に、発見されたオーバーライドファイルを重ねる。
pub fn load_registry() -> Result<Registry> {
    let mut registry = builtin();
    if let Some(path) = discover_override() {
        info!(path = %path.display(), "Loading registry override");
        registry.merge(load_override(&path)?);
    }
    Ok(registry)
}

/// devservices.yml を発見する
///
/// 優先順位:
/// 1. 環境変数 DEVSERVICES_CONFIG
/// 2. カレントディレクトリから上に向かって devservices.yml を探す
pub fn discover_override() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("DEVSERVICES_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let mut current = std::env::current_dir().ok()?;
    loop {
        let candidate = current.join(OVERRIDE_FILE);
        if candidate.exists() {
            debug!(path = %candidate.display(), "Found registry override");
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// オーバーライドファイルを読み込む
pub fn load_override(path: &Path) -> Result<Registry> {
    let content = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|e| DevServiceError::RegistryParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn string_map<const N: usize>(pairs: [(&str, &str); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// 組み込みのサービスレジストリ
///
/// devserverが依存する標準スタック。イベントストリームやキャッシュの
/// 構成によっては only_if 条件で除外される。
pub fn builtin() -> Registry {
    let mut registry = Registry::new();

    registry.insert(
        "redis",
        ServiceSpec {
            image: Some("redis:5.0-alpine".to_string()),
            command: Some(vec![
                "redis-server".to_string(),
                "--appendonly".to_string(),
                "yes".to_string(),
            ]),
            ports: BTreeMap::from([(6379, PortSpec::Plain(6379))]),
            volumes: string_map([("redis", "/data")]),
            ..Default::default()
        },
    );

    registry.insert(
        "postgres",
        ServiceSpec {
            image: Some("postgres:9.6-alpine".to_string()),
            ports: BTreeMap::from([(5432, PortSpec::Plain(5432))]),
            environment: string_map([
                ("POSTGRES_DB", "sentry"),
                ("POSTGRES_HOST_AUTH_METHOD", "trust"),
            ]),
            volumes: string_map([("postgres", "/var/lib/postgresql/data")]),
            ..Default::default()
        },
    );

    registry.insert(
        "zookeeper",
        ServiceSpec {
            image: Some("confluentinc/cp-zookeeper:5.1.2".to_string()),
            environment: string_map([("ZOOKEEPER_CLIENT_PORT", "2181")]),
            volumes: string_map([("zookeeper", "/var/lib/zookeeper")]),
            only_if: Condition::EventStreamIn(vec![
                "kafka".to_string(),
                "snuba".to_string(),
            ]),
            ..Default::default()
        },
    );

    registry.insert(
        "kafka",
        ServiceSpec {
            image: Some("confluentinc/cp-kafka:5.1.2".to_string()),
            ports: BTreeMap::from([(9092, PortSpec::Plain(9092))]),
            environment: string_map([
                (
                    "KAFKA_ZOOKEEPER_CONNECT",
                    "{containers[zookeeper][name]}:2181",
                ),
                (
                    "KAFKA_LISTENERS",
                    "INTERNAL://0.0.0.0:9093,EXTERNAL://0.0.0.0:9092",
                ),
                (
                    "KAFKA_ADVERTISED_LISTENERS",
                    "INTERNAL://{containers[kafka][name]}:9093,EXTERNAL://127.0.0.1:{containers[kafka][ports][9092]}",
                ),
                (
                    "KAFKA_LISTENER_SECURITY_PROTOCOL_MAP",
                    "INTERNAL:PLAINTEXT,EXTERNAL:PLAINTEXT",
                ),
                ("KAFKA_INTER_BROKER_LISTENER_NAME", "INTERNAL"),
                ("KAFKA_OFFSETS_TOPIC_REPLICATION_FACTOR", "1"),
            ]),
            volumes: string_map([("kafka", "/var/lib/kafka")]),
            only_if: Condition::EventStreamIn(vec![
                "kafka".to_string(),
                "snuba".to_string(),
            ]),
            ..Default::default()
        },
    );

    registry.insert(
        "clickhouse",
        ServiceSpec {
            image: Some("yandex/clickhouse-server:19.11".to_string()),
            ports: BTreeMap::from([
                (8123, PortSpec::Plain(8123)),
                (9000, PortSpec::Plain(9000)),
                (9009, PortSpec::Plain(9009)),
            ]),
            volumes: string_map([("clickhouse", "/var/lib/clickhouse")]),
            only_if: Condition::EventStreamIn(vec!["snuba".to_string()]),
            ..Default::default()
        },
    );

    registry.insert(
        "snuba",
        ServiceSpec {
            image: Some("getsentry/snuba:latest".to_string()),
            pull: true,
            ports: BTreeMap::from([(1218, PortSpec::Plain(1218))]),
            command: Some(vec!["devserver".to_string()]),
            environment: string_map([
                ("PYTHONUNBUFFERED", "1"),
                ("SNUBA_SETTINGS", "docker"),
                ("DEBUG", "1"),
                ("CLICKHOUSE_HOST", "{containers[clickhouse][name]}"),
                ("CLICKHOUSE_PORT", "9000"),
                ("DEFAULT_BROKERS", "{containers[kafka][name]}:9093"),
                ("REDIS_HOST", "{containers[redis][name]}"),
                ("REDIS_PORT", "6379"),
                ("REDIS_DB", "1"),
            ]),
            only_if: Condition::EventStreamIn(vec![
                "kafka".to_string(),
                "snuba".to_string(),
            ]),
            ..Default::default()
        },
    );

    registry.insert(
        "memcached",
        ServiceSpec {
            image: Some("memcached:1.5-alpine".to_string()),
            ports: BTreeMap::from([(11211, PortSpec::Plain(11211))]),
            only_if: Condition::CacheContains("memcached".to_string()),
            ..Default::default()
        },
    );

    registry.insert(
        "symbolicator",
        ServiceSpec {
            image: Some("us.gcr.io/sentryio/symbolicator:latest".to_string()),
            pull: true,
            ports: BTreeMap::from([(3021, PortSpec::Plain(3021))]),
            command: Some(vec!["run".to_string()]),
            only_if: Condition::OptionEnabled("symbolicator.enabled".to_string()),
            ..Default::default()
        },
    );

    registry.insert(
        "relay",
        ServiceSpec {
            image: Some("us.gcr.io/sentryio/relay:latest".to_string()),
            pull: true,
            ports: BTreeMap::from([(7899, PortSpec::Plain(7899))]),
            with_devserver: true,
            only_if: Condition::OptionEnabled("relay.enabled".to_string()),
            ..Default::default()
        },
    );

    registry
}
