use crate::docker;
use crate::reconcile;
use colored::Colorize;
use devservices_core::{Settings, load_registry};
use futures_util::stream::StreamExt;

pub async fn handle(project: &str, fast: bool, service: &str) -> anyhow::Result<()> {
    // devserver側の無関係なバックエンド検証を飛ばす
    // SAFETY: 他スレッドが環境変数を読む前のコマンド冒頭で設定する
    unsafe {
        std::env::set_var("SENTRY_SKIP_BACKEND_VALIDATION", "1");
    }

    let registry = load_registry()?;
    let settings = Settings::from_env();

    // attachでは除外レポートを出さない
    let containers = devservices_core::resolve(&registry, &settings, project)?;
    if !containers.contains(service) {
        anyhow::bail!("サービス '{}' は不明か、無効化されています", service);
    }

    let docker_conn = docker::connect().await?;

    // 遅延起動のサービスでも必ず起動する（always_start）
    let container_name = reconcile::start_service(
        &docker_conn,
        service,
        &containers,
        &settings,
        project,
        fast,
        true,
    )
    .await?;

    // ログをフォアグラウンドへ流し続ける。SIGINT/SIGTERMで抜ける
    #[allow(deprecated)]
    let options = bollard::container::LogsOptions::<String> {
        follow: true,
        stdout: true,
        stderr: true,
        tail: "all".to_string(),
        ..Default::default()
    };

    let mut log_stream = docker_conn.logs(&container_name, Some(options));
    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = sigterm.recv() => break,
            log = log_stream.next() => match log {
                Some(Ok(output)) => {
                    use std::io::Write;
                    let mut stdout = std::io::stdout();
                    stdout.write_all(&output.into_bytes())?;
                    stdout.flush()?;
                }
                Some(Err(e)) => {
                    eprintln!("  ⚠ ログ取得エラー: {}", e);
                    break;
                }
                // コンテナが停止するとストリームが閉じる
                None => break,
            },
        }
    }

    // シグナルでも通常終了でもコンテナを止めてから抜ける。
    // 停止中の再割り込みはどこにも届かず握り潰され、終了が継続する
    eprintln!("{}", format!("Shutting down {}", service).yellow());
    match docker_conn
        .stop_container(
            &container_name,
            None::<bollard::query_parameters::StopContainerOptions>,
        )
        .await
    {
        Ok(_) => {}
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 304, ..
        }) => {}
        Err(e) => eprintln!("  ⚠ 停止エラー: {}", e),
    }

    Ok(())
}
