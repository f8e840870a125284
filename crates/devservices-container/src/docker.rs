//! Docker接続ヘルパー

use crate::error::{ContainerError, Result};
use bollard::Docker;
use tracing::debug;

/// Docker接続を初期化して疎通確認する
pub async fn connect() -> Result<Docker> {
    let docker = Docker::connect_with_local_defaults()
        .map_err(|e| ContainerError::DockerConnectionFailed(e.to_string()))?;
    docker
        .ping()
        .await
        .map_err(|e| ContainerError::DockerConnectionFailed(e.to_string()))?;
    debug!("Docker daemon reachable");
    Ok(docker)
}

/// イメージがローカルに存在するか確認する
pub async fn image_exists(docker: &Docker, image: &str) -> Result<bool> {
    match docker.inspect_image(image).await {
        Ok(_) => Ok(true),
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
