use crate::docker;
use crate::reconcile;
use colored::Colorize;
use devservices_core::{Settings, load_registry};

pub async fn handle(project: &str, exclude: &[String], fast: bool) -> anyhow::Result<()> {
    // devserver側の無関係なバックエンド検証を飛ばす
    // SAFETY: 他スレッドが環境変数を読む前のコマンド冒頭で設定する
    unsafe {
        std::env::set_var("SENTRY_SKIP_BACKEND_VALIDATION", "1");
    }

    let registry = load_registry()?;
    let settings = Settings::from_env();

    let docker_conn = docker::connect().await?;

    // プロジェクトネットワーク。既存なら再利用
    docker::get_or_create_network(&docker_conn, project).await?;

    let containers = devservices_core::resolve(&registry, &settings, project)?;
    for name in &containers.skipped {
        eprintln!(
            "{}",
            format!("! only_if 条件により {} をスキップ", name).cyan()
        );
    }

    if fast {
        eprintln!(
            "{}",
            "> 警告: fastモードはイメージ更新を一切行わないため、サービスが古いままの可能性があります"
                .red()
        );
    }

    // レジストリの定義順に起動する（依存サービスが先）
    for name in registry.names() {
        if exclude.iter().any(|excluded| excluded == name) {
            continue;
        }
        if !containers.contains(name) {
            continue;
        }

        reconcile::start_service(
            &docker_conn,
            name,
            &containers,
            &settings,
            project,
            fast,
            false,
        )
        .await?;
    }

    Ok(())
}
