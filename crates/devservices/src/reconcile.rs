//! コンテナ調停
//!
//! upとattachで共有される、単一サービスのコンテナを望ましい状態へ
//! 収束させる処理。コンテナの実状態はDocker側だけが持ち、ここでは
//! 問い合わせと作成・起動・再作成だけを行う。

use crate::docker;
use colored::Colorize;
use devservices_core::{ResolvedService, ResolvedSet, Settings, interpolate, volume_name};

/// 既存コンテナを再利用するかどうかの判定
///
/// pull指定のあるサービスは、新しく取得したイメージでコンテナを
/// 作り直す必要がある。ただしwith_devserver対象とfastモードは
/// 常に再利用を強制する。この優先順位は既存の開発フローが
/// 依存しているため変更しないこと。
fn should_reuse_container(pull: bool, with_devserver: bool, fast: bool) -> bool {
    if with_devserver || fast {
        return true;
    }
    !pull
}

/// イベントストリーム構成に応じたサービス固有の上書き
///
/// HACK: snubaはイベントストリームのバックエンドがsnubaのとき、
/// devserverのフルセットを動かせないためAPI限定版に差し替え、
/// ブローカー探索の環境変数を外す。サービス名で分岐する特例であり、
/// フックとして一般化はしない。
fn apply_backend_overrides(name: &str, options: &mut ResolvedService, settings: &Settings) {
    if name == "snuba" && settings.event_stream.contains("snuba") {
        options.environment.remove("DEFAULT_BROKERS");
        options.command = Some(vec!["devserver".to_string(), "--no-workers".to_string()]);
    }
}

/// 単一サービスのコンテナを望ましい状態にする
///
/// 戻り値は対象のコンテナ名。attachはこれを使ってログ追跡と
/// 終了時の停止を行う。
pub async fn start_service(
    docker_conn: &bollard::Docker,
    name: &str,
    containers: &ResolvedSet,
    settings: &Settings,
    project: &str,
    fast: bool,
    always_start: bool,
) -> anyhow::Result<String> {
    let mut options = containers
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("サービス '{}' は不明か、無効化されています", name))?
        .clone();

    apply_backend_overrides(name, &mut options, settings);

    // 環境変数テンプレートを解決済みオプション全体で展開
    for value in options.environment.values_mut() {
        *value = interpolate(value, containers);
    }

    // イメージ更新。fastモードでは一切行わない
    if !fast {
        if options.pull {
            docker::pull_image(docker_conn, &options.image).await?;
        } else if !devservices_container::image_exists(docker_conn, &options.image).await? {
            // 初回（イメージがローカルにない）はpull指定に関わらず必ず取得する
            docker::pull_image(docker_conn, &options.image).await?;
        }
    }

    // 名前付きボリュームの実体化。パス区切りを含まないマウント名が対象で、
    // マウント名を名前空間付きに書き換える
    let mounts: Vec<String> = options
        .volumes
        .keys()
        .filter(|mount| !mount.contains('/'))
        .cloned()
        .collect();
    for mount in mounts {
        let namespaced = volume_name(project, &mount);
        docker::get_or_create_volume(docker_conn, &namespaced).await?;
        if let Some(path) = options.volumes.remove(&mount) {
            options.volumes.insert(namespaced, path);
        }
    }

    let listening = if options.ports.is_empty() {
        String::new()
    } else {
        format!(
            "(listening: {})",
            options
                .ports
                .values()
                .map(|binding| binding.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    };

    // 既存コンテナの確認。404は「存在しないので作る」であってエラーではない
    let exists = match docker_conn
        .inspect_container(
            &options.container_name,
            None::<bollard::query_parameters::InspectContainerOptions>,
        )
        .await
    {
        Ok(_) => true,
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => false,
        Err(e) => return Err(e.into()),
    };

    if exists {
        if should_reuse_container(options.pull, options.with_devserver, fast) {
            if options.with_devserver && !always_start {
                eprintln!(
                    "{}",
                    format!(
                        "> '{}' はdevserverからオンデマンドで起動されるため、ここでは起動しません",
                        options.container_name
                    )
                    .yellow()
                );
                return Ok(options.container_name);
            }

            eprintln!(
                "{}",
                format!(
                    "> 既存コンテナ '{}' を起動 {}",
                    options.container_name, listening
                )
                .yellow()
            );
            // 既に起動中なら304が返るだけ。繰り返しのupはその分速い
            start_container(docker_conn, &options.container_name).await?;
            return Ok(options.container_name);
        }

        eprintln!(
            "{}",
            format!("> コンテナ '{}' を停止", options.container_name).yellow()
        );
        match docker_conn
            .stop_container(
                &options.container_name,
                None::<bollard::query_parameters::StopContainerOptions>,
            )
            .await
        {
            Ok(_) => {}
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 304, ..
            }) => {}
            Err(e) => return Err(e.into()),
        }

        eprintln!(
            "{}",
            format!("> コンテナ '{}' を削除", options.container_name).yellow()
        );
        docker_conn
            .remove_container(
                &options.container_name,
                None::<bollard::query_parameters::RemoveContainerOptions>,
            )
            .await?;
    }

    eprintln!(
        "{}",
        format!("> コンテナ '{}' を作成", options.container_name).yellow()
    );
    let (config, create_options) = devservices_container::to_container_config(&options);
    #[allow(deprecated)]
    docker_conn
        .create_container(Some(create_options), config)
        .await?;

    // 作成はするが起動はattach経由に限るサービス
    if options.with_devserver && !always_start {
        eprintln!(
            "{}",
            format!(
                "> '{}' はdevserverからオンデマンドで起動されるため、ここでは起動しません",
                options.container_name
            )
            .yellow()
        );
        return Ok(options.container_name);
    }

    eprintln!(
        "{}",
        format!(
            "> コンテナ '{}' を起動 {}",
            options.container_name, listening
        )
        .yellow()
    );
    start_container(docker_conn, &options.container_name).await?;

    Ok(options.container_name)
}

async fn start_container(docker_conn: &bollard::Docker, name: &str) -> anyhow::Result<()> {
    match docker_conn
        .start_container(
            name,
            None::<bollard::query_parameters::StartContainerOptions>,
        )
        .await
    {
        Ok(_) => Ok(()),
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 304, ..
        }) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
