//! オプションリゾルバ
//!
//! 静的なレジストリ・グローバル設定・プロジェクト名から、有効な
//! サービスの解決済みコンテナオプションを生成する純粋な変換。
//! Dockerへの問い合わせはここでは行いません。

use crate::error::{DevServiceError, Result};
use crate::model::{PortBinding, RestartPolicy, ServiceSpec, Settings};
use crate::registry::Registry;
use std::collections::BTreeMap;
use tracing::debug;

/// 解決済みコンテナオプション
///
/// ServiceSpecにデフォルト適用と名前空間付与を済ませたもの。
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedService {
    /// 元のサービス名
    pub service: String,
    /// コンテナ名 ({project}_{service})
    pub container_name: String,
    pub image: String,
    pub command: Option<Vec<String>>,
    /// コンテナポート → 正規化済みホストバインディング
    pub ports: BTreeMap<u16, PortBinding>,
    pub environment: BTreeMap<String, String>,
    /// マウント名 → コンテナ内パス。名前付きボリュームの名前空間付与は
    /// 調停時（ボリューム実体化と同時）に行う
    pub volumes: BTreeMap<String, String>,
    /// 所属ネットワーク（プロジェクト名そのもの）
    pub network: String,
    pub restart: RestartPolicy,
    pub pull: bool,
    pub with_devserver: bool,
    pub detach: bool,
}

/// リゾルバの結果
#[derive(Debug, Clone, Default)]
pub struct ResolvedSet {
    /// サービス名 → 解決済みオプション
    pub services: BTreeMap<String, ResolvedService>,
    /// only_if条件により除外されたサービス名
    pub skipped: Vec<String>,
}

impl ResolvedSet {
    pub fn get(&self, name: &str) -> Option<&ResolvedService> {
        self.services.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }
}

/// 管理対象リソースの名前空間プレフィックス
pub fn name_prefix(project: &str) -> String {
    format!("{}_", project)
}

/// コンテナ名を生成
pub fn container_name(project: &str, service: &str) -> String {
    format!("{}_{}", project, service)
}

/// 名前付きボリューム名を生成
pub fn volume_name(project: &str, mount: &str) -> String {
    format!("{}_{}", project, mount)
}

/// レジストリを解決済みコンテナオプションへ変換する
///
/// only_if条件が偽のサービスは除外してskippedに記録する。
/// ポートは必ず明示的な (インターフェース, ポート) の組に正規化され、
/// 素のポート番号はループバックにのみ束縛される。
pub fn resolve(
    registry: &Registry,
    settings: &Settings,
    project: &str,
) -> Result<ResolvedSet> {
    let mut resolved = ResolvedSet::default();

    for (name, spec) in registry.iter() {
        if !spec.only_if.evaluate(settings) {
            resolved.skipped.push(name.to_string());
            continue;
        }

        resolved
            .services
            .insert(name.to_string(), resolve_service(name, spec, project)?);
    }

    debug!(
        services = resolved.services.len(),
        skipped = resolved.skipped.len(),
        "Registry resolved"
    );
    Ok(resolved)
}

fn resolve_service(name: &str, spec: &ServiceSpec, project: &str) -> Result<ResolvedService> {
    let image = spec
        .image
        .clone()
        .ok_or_else(|| DevServiceError::MissingImage(name.to_string()))?;

    let ports = spec
        .ports
        .iter()
        .map(|(container_port, port_spec)| (*container_port, port_spec.ensure_interface()))
        .collect();

    Ok(ResolvedService {
        service: name.to_string(),
        container_name: container_name(project, name),
        image,
        command: spec.command.clone(),
        ports,
        environment: spec.environment.clone(),
        volumes: spec.volumes.clone(),
        network: project.to_string(),
        restart: spec.restart.unwrap_or_default(),
        pull: spec.pull,
        with_devserver: spec.with_devserver,
        detach: true,
    })
}
