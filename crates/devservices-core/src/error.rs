use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevServiceError {
    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("レジストリ定義のパースエラー: {path}\n理由: {message}")]
    RegistryParse { path: PathBuf, message: String },

    #[error("サービス '{0}' は不明か、無効化されています")]
    ServiceNotFound(String),

    #[error("サービス '{0}' に image が指定されていません")]
    MissingImage(String),
}

pub type Result<T> = std::result::Result<T, DevServiceError>;
