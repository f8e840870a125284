//! Docker接続・イメージ・リソース操作のヘルパー

use colored::Colorize;
use futures_util::stream::StreamExt;

/// Docker接続を初期化（エラーハンドリング付き）
pub async fn connect() -> anyhow::Result<bollard::Docker> {
    match devservices_container::connect().await {
        Ok(docker) => Ok(docker),
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ Docker接続エラー".red().bold());
            eprintln!();
            eprintln!("{}", e);
            eprintln!();
            Err(anyhow::anyhow!("Dockerが起動していることを確認してください"))
        }
    }
}

/// Docker config.json からレジストリの認証情報を取得
pub fn get_docker_credentials(registry: &str) -> Option<bollard::auth::DockerCredentials> {
    let home = std::env::var("HOME").ok()?;
    let config_path = format!("{}/.docker/config.json", home);
    let config_content = std::fs::read_to_string(&config_path).ok()?;
    let config: serde_json::Value = serde_json::from_str(&config_content).ok()?;

    let auths = config.get("auths")?.as_object()?;
    let auth_entry = auths.get(registry)?;
    let auth_b64 = auth_entry.get("auth")?.as_str()?;

    // Base64 デコード (username:password 形式)
    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(auth_b64)
        .ok()?;
    let auth_str = String::from_utf8(decoded).ok()?;
    let (username, password) = auth_str.split_once(':')?;

    Some(bollard::auth::DockerCredentials {
        username: Some(username.to_string()),
        password: Some(password.to_string()),
        serveraddress: Some(registry.to_string()),
        ..Default::default()
    })
}

/// イメージ名からレジストリ部分を抽出
pub fn extract_registry(image: &str) -> Option<&str> {
    // us.gcr.io/sentryio/relay:latest のような形式。
    // 最初のセグメントが . か : を含む場合のみレジストリとみなす
    if image.contains('/') {
        let first = image.split('/').next()?;
        if first.contains('.') || first.contains(':') {
            return Some(first);
        }
    }
    None
}

/// イメージ名とタグを分離
/// 例: "redis:5.0-alpine" -> ("redis", "5.0-alpine")
///     "getsentry/snuba" -> ("getsentry/snuba", "latest")
pub fn parse_image_tag(image: &str) -> (&str, &str) {
    if let Some((name, tag)) = image.rsplit_once(':') {
        // ポート付きレジストリ (localhost:5000/foo) をタグと誤認しない
        if !tag.contains('/') {
            return (name, tag);
        }
    }
    (image, "latest")
}

/// イメージをpullする。進捗はstderrへ表示
pub async fn pull_image(docker: &bollard::Docker, image: &str) -> anyhow::Result<()> {
    eprintln!("{}", format!("> イメージ '{}' をpull中", image).green());

    let credentials = extract_registry(image).and_then(get_docker_credentials);
    let (image_name, tag) = parse_image_tag(image);

    #[allow(deprecated)]
    let options = bollard::image::CreateImageOptions {
        from_image: image_name,
        tag,
        ..Default::default()
    };

    #[allow(deprecated)]
    let mut stream = docker.create_image(Some(options), None, credentials);

    while let Some(info) = stream.next().await {
        match info {
            Ok(bollard::models::CreateImageInfo {
                status: Some(status),
                progress: Some(progress),
                ..
            }) => {
                // 進捗を同じ行に上書き
                eprint!("\r  ↓ {}: {}", status, progress);
            }
            Ok(bollard::models::CreateImageInfo {
                status: Some(status),
                ..
            }) => {
                eprint!("\r  ↓ {}                    ", status);
            }
            Err(e) => {
                eprintln!();
                return Err(anyhow::anyhow!(
                    "イメージ '{}' のpullに失敗しました: {}",
                    image,
                    e
                ));
            }
            _ => {}
        }
    }

    eprintln!();
    Ok(())
}

/// プロジェクトネットワークを取得、なければ作成
pub async fn get_or_create_network(
    docker: &bollard::Docker,
    name: &str,
) -> anyhow::Result<()> {
    match docker
        .inspect_network(
            name,
            None::<bollard::query_parameters::InspectNetworkOptions>,
        )
        .await
    {
        Ok(_) => Ok(()),
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => {
            eprintln!("{}", format!("> ネットワーク '{}' を作成", name).yellow());
            docker
                .create_network(bollard::models::NetworkCreateRequest {
                    name: name.to_string(),
                    driver: Some("bridge".to_string()),
                    ..Default::default()
                })
                .await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// 名前付きボリュームを取得、なければ作成
pub async fn get_or_create_volume(
    docker: &bollard::Docker,
    name: &str,
) -> anyhow::Result<()> {
    match docker.inspect_volume(name).await {
        Ok(_) => Ok(()),
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => {
            eprintln!("{}", format!("> ボリューム '{}' を作成", name).yellow());
            #[allow(deprecated)]
            docker
                .create_volume(bollard::volume::CreateVolumeOptions {
                    name: name.to_string(),
                    ..Default::default()
                })
                .await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
