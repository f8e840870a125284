//! 解決済みサービスから Docker API パラメータへの変換

// Bollard 0.19 の非推奨APIを一時的に使用
#![allow(deprecated)]

use bollard::container::{Config, CreateContainerOptions, NetworkingConfig};
use bollard::models::{EndpointSettings, HostConfig, RestartPolicyNameEnum};
use devservices_core::{ResolvedService, RestartPolicy};
use std::collections::HashMap;

fn restart_policy_name(restart: RestartPolicy) -> RestartPolicyNameEnum {
    match restart {
        RestartPolicy::No => RestartPolicyNameEnum::NO,
        RestartPolicy::Always => RestartPolicyNameEnum::ALWAYS,
        RestartPolicy::OnFailure => RestartPolicyNameEnum::ON_FAILURE,
        RestartPolicy::UnlessStopped => RestartPolicyNameEnum::UNLESS_STOPPED,
    }
}

/// 解決済みサービスをDockerのコンテナ設定に変換
///
/// ポートは正規化済みの (インターフェース, ポート) の組を前提とする。
/// 名前付きボリュームのマウント名は呼び出し側で名前空間付与済みであること。
pub fn to_container_config(
    resolved: &ResolvedService,
) -> (Config<String>, CreateContainerOptions<String>) {
    // 環境変数の設定
    let env: Vec<String> = resolved
        .environment
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    // ポートバインディングの設定
    let mut port_bindings = HashMap::new();
    let mut exposed_ports = HashMap::new();

    for (container_port, binding) in &resolved.ports {
        let key = format!("{}/tcp", container_port);

        exposed_ports.insert(key.clone(), HashMap::new());
        port_bindings.insert(
            key,
            Some(vec![bollard::models::PortBinding {
                host_ip: Some(binding.host_ip.clone()),
                host_port: Some(binding.host_port.to_string()),
            }]),
        );
    }

    // マウント設定。名前付きボリュームもホストパスも同じ書式で渡せる
    let binds: Vec<String> = resolved
        .volumes
        .iter()
        .map(|(mount, path)| format!("{}:{}", mount, path))
        .collect();

    let host_config = Some(HostConfig {
        port_bindings: Some(port_bindings),
        binds: Some(binds),
        network_mode: Some(resolved.network.clone()),
        restart_policy: Some(bollard::models::RestartPolicy {
            name: Some(restart_policy_name(resolved.restart)),
            maximum_retry_count: None,
        }),
        ..Default::default()
    });

    // ラベル設定
    let mut labels = HashMap::new();
    labels.insert(
        "devservices.project".to_string(),
        resolved.network.clone(),
    );
    labels.insert("devservices.service".to_string(), resolved.service.clone());

    // ネットワーク設定（サービス名でエイリアス）
    let mut endpoints = HashMap::new();
    endpoints.insert(
        resolved.network.clone(),
        EndpointSettings {
            aliases: Some(vec![resolved.service.clone()]),
            ..Default::default()
        },
    );

    let config = Config {
        image: Some(resolved.image.clone()),
        env: Some(env),
        exposed_ports: Some(exposed_ports),
        host_config,
        labels: Some(labels),
        cmd: resolved.command.clone(),
        networking_config: Some(NetworkingConfig {
            endpoints_config: endpoints,
        }),
        ..Default::default()
    };

    let options = CreateContainerOptions {
        name: resolved.container_name.clone(),
        platform: None,
    };

    (config, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use devservices_core::PortBinding;
    use std::collections::BTreeMap;

    fn resolved(service: &str, project: &str) -> ResolvedService {
        ResolvedService {
            service: service.to_string(),
            container_name: format!("{}_{}", project, service),
            image: format!("{}:latest", service),
            command: None,
            ports: BTreeMap::new(),
            environment: BTreeMap::new(),
            volumes: BTreeMap::new(),
            network: project.to_string(),
            restart: RestartPolicy::OnFailure,
            pull: false,
            with_devserver: false,
            detach: true,
        }
    }

    #[test]
    fn test_basic_config() {
        let (config, options) = to_container_config(&resolved("redis", "sentry"));

        assert_eq!(config.image, Some("redis:latest".to_string()));
        assert_eq!(options.name, "sentry_redis");
    }

    #[test]
    fn test_port_bindings() {
        let mut service = resolved("db", "demo");
        service.ports.insert(
            5432,
            PortBinding {
                host_ip: "127.0.0.1".to_string(),
                host_port: 5432,
            },
        );

        let (config, _) = to_container_config(&service);

        let exposed_ports = config.exposed_ports.unwrap();
        assert!(exposed_ports.contains_key("5432/tcp"));

        let host_config = config.host_config.unwrap();
        let port_bindings = host_config.port_bindings.unwrap();
        let binding = port_bindings.get("5432/tcp").unwrap().as_ref().unwrap();
        assert_eq!(binding[0].host_ip, Some("127.0.0.1".to_string()));
        assert_eq!(binding[0].host_port, Some("5432".to_string()));
    }

    #[test]
    fn test_environment_format() {
        let mut service = resolved("snuba", "sentry");
        service
            .environment
            .insert("SNUBA_SETTINGS".to_string(), "docker".to_string());
        service
            .environment
            .insert("DEBUG".to_string(), "1".to_string());

        let (config, _) = to_container_config(&service);

        let env = config.env.unwrap();
        assert!(env.contains(&"SNUBA_SETTINGS=docker".to_string()));
        assert!(env.contains(&"DEBUG=1".to_string()));
    }

    #[test]
    fn test_volume_binds() {
        let mut service = resolved("postgres", "sentry");
        service.volumes.insert(
            "sentry_postgres".to_string(),
            "/var/lib/postgresql/data".to_string(),
        );
        service
            .volumes
            .insert("/etc/nginx.conf".to_string(), "/etc/nginx/nginx.conf".to_string());

        let (config, _) = to_container_config(&service);

        let binds = config.host_config.unwrap().binds.unwrap();
        assert!(binds.contains(&"sentry_postgres:/var/lib/postgresql/data".to_string()));
        assert!(binds.contains(&"/etc/nginx.conf:/etc/nginx/nginx.conf".to_string()));
    }

    #[test]
    fn test_restart_policy() {
        let (config, _) = to_container_config(&resolved("redis", "sentry"));

        let policy = config.host_config.unwrap().restart_policy.unwrap();
        assert_eq!(policy.name, Some(RestartPolicyNameEnum::ON_FAILURE));
    }

    #[test]
    fn test_network_and_alias() {
        let (config, _) = to_container_config(&resolved("clickhouse", "demo"));

        let host_config = config.host_config.unwrap();
        assert_eq!(host_config.network_mode, Some("demo".to_string()));

        let networking = config.networking_config.unwrap();
        let endpoint = networking.endpoints_config.get("demo").unwrap();
        assert_eq!(endpoint.aliases, Some(vec!["clickhouse".to_string()]));
    }

    #[test]
    fn test_labels() {
        let (config, _) = to_container_config(&resolved("kafka", "sentry"));

        let labels = config.labels.unwrap();
        assert_eq!(labels.get("devservices.project"), Some(&"sentry".to_string()));
        assert_eq!(labels.get("devservices.service"), Some(&"kafka".to_string()));
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn test_command_passthrough() {
        let mut service = resolved("snuba", "sentry");
        service.command = Some(vec!["devserver".to_string(), "--no-workers".to_string()]);

        let (config, _) = to_container_config(&service);

        assert_eq!(
            config.cmd,
            Some(vec!["devserver".to_string(), "--no-workers".to_string()])
        );
    }
}
