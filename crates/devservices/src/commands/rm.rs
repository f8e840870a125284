use crate::commands::down::{matches_filter, project_containers};
use crate::docker;
use colored::Colorize;
use devservices_core::name_prefix;

/// 破壊的操作の対話確認。辞退なら何も変更せずに中止する
fn confirm_destruction() -> anyhow::Result<bool> {
    eprintln!(
        "{}",
        "本当に続行しますか？ プロジェクトに関連するデータはすべて削除されます。"
            .red()
            .bold()
    );
    eprint!("[y/N]: ");

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

pub async fn handle(project: &str, services: &[String]) -> anyhow::Result<()> {
    if !confirm_destruction()? {
        eprintln!("{}", "中止しました".yellow());
        std::process::exit(1);
    }

    let docker_conn = docker::connect().await?;
    let prefix = name_prefix(project);

    // コンテナの停止と削除
    for name in project_containers(&docker_conn, &prefix).await? {
        if !matches_filter(&name, &prefix, services) {
            continue;
        }

        eprintln!("{}", format!("> コンテナ '{}' を削除", name).red());
        match docker_conn
            .stop_container(
                &name,
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
        docker_conn
            .remove_container(
                &name,
                None::<bollard::query_parameters::RemoveContainerOptions>,
            )
            .await?;
    }

    // 名前空間付きボリュームの削除
    let volumes = docker_conn
        .list_volumes(None::<bollard::query_parameters::ListVolumesOptions>)
        .await?;
    for volume in volumes.volumes.unwrap_or_default() {
        if !matches_filter(&volume.name, &prefix, services) {
            continue;
        }

        eprintln!("{}", format!("> ボリューム '{}' を削除", volume.name).red());
        docker_conn
            .remove_volume(
                &volume.name,
                None::<bollard::query_parameters::RemoveVolumeOptions>,
            )
            .await?;
    }

    // ネットワークはサービス指定がないときだけ削除する。
    // 404は「最初から存在しない」なのでそのまま成功扱い
    if services.is_empty() {
        match docker_conn
            .inspect_network(
                project,
                None::<bollard::query_parameters::InspectNetworkOptions>,
            )
            .await
        {
            Ok(_) => {
                eprintln!("{}", format!("> ネットワーク '{}' を削除", project).red());
                docker_conn.remove_network(project).await?;
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
