use crate::docker;
use colored::Colorize;
use devservices_core::name_prefix;

/// プロジェクトのコンテナ名一覧を取得する（停止中も含む）
pub async fn project_containers(
    docker_conn: &bollard::Docker,
    prefix: &str,
) -> anyhow::Result<Vec<String>> {
    #[allow(deprecated)]
    let options = bollard::container::ListContainersOptions::<String> {
        all: true,
        ..Default::default()
    };

    let containers = docker_conn.list_containers(Some(options)).await?;

    // Docker APIのnameフィルタは部分一致なので、プレフィックスは自前で判定する
    Ok(containers
        .into_iter()
        .filter_map(|container| {
            container
                .names
                .as_ref()
                .and_then(|names| names.first())
                .map(|name| name.trim_start_matches('/').to_string())
        })
        .filter(|name| name.starts_with(prefix))
        .collect())
}

/// サービスフィルタに一致するか（フィルタなしは全件一致）
pub fn matches_filter(name: &str, prefix: &str, services: &[String]) -> bool {
    let Some(suffix) = name.strip_prefix(prefix) else {
        return false;
    };
    services.is_empty() || services.iter().any(|service| service == suffix)
}

pub async fn handle(project: &str, services: &[String]) -> anyhow::Result<()> {
    let docker_conn = docker::connect().await?;
    let prefix = name_prefix(project);

    for name in project_containers(&docker_conn, &prefix).await? {
        if !matches_filter(&name, &prefix, services) {
            continue;
        }

        eprintln!("{}", format!("> コンテナ '{}' を停止", name).red());
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
            }) => {
                eprintln!("  ℹ 既に停止しています");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_filter_no_services() {
        // フィルタなしはプレフィックス一致がすべて対象
        assert!(matches_filter("sentry_redis", "sentry_", &[]));
        assert!(matches_filter("sentry_postgres", "sentry_", &[]));
        assert!(!matches_filter("other_redis", "sentry_", &[]));
    }

    #[test]
    fn test_matches_filter_with_services() {
        let services = vec!["redis".to_string()];
        assert!(matches_filter("sentry_redis", "sentry_", &services));
        assert!(!matches_filter("sentry_postgres", "sentry_", &services));
    }

    #[test]
    fn test_matches_filter_exact_suffix() {
        // サービス名はプレフィックス除去後の完全一致
        let services = vec!["redis".to_string()];
        assert!(!matches_filter("sentry_redis-replica", "sentry_", &services));
    }
}
