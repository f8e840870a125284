mod commands;
mod docker;
mod reconcile;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "devservices")]
#[command(about = "devserverが依存する開発用サービスを管理する", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 単一サービスをフォアグラウンドで起動し、ログを流し続ける
    ///
    /// upと違い、遅延起動のサービスでも必ず起動する。Ctrl+Cで
    /// コンテナを停止してから終了する。devserverから使われる
    Attach {
        /// プロジェクト名（コンテナ・ボリューム・ネットワークの名前空間）
        #[arg(long, default_value = "sentry")]
        project: String,
        /// イメージ更新を行わず、既存コンテナを常に再利用する
        #[arg(long)]
        fast: bool,
        /// サービス名
        service: String,
    },
    /// 有効なサービスをすべて起動・更新する
    Up {
        /// プロジェクト名（コンテナ・ボリューム・ネットワークの名前空間）
        #[arg(long, default_value = "sentry")]
        project: String,
        /// 起動しないサービス（カンマ区切り、複数指定可）
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
        /// イメージ更新を行わず、既存コンテナを常に再利用する
        #[arg(long)]
        fast: bool,
    },
    /// プロジェクトのコンテナを停止する
    Down {
        /// プロジェクト名（コンテナ・ボリューム・ネットワークの名前空間）
        #[arg(long, default_value = "sentry")]
        project: String,
        /// 対象サービス（省略時は全サービス）
        service: Vec<String>,
    },
    /// プロジェクトのコンテナ・ボリューム・ネットワークを削除する
    Rm {
        /// プロジェクト名（コンテナ・ボリューム・ネットワークの名前空間）
        #[arg(long, default_value = "sentry")]
        project: String,
        /// 対象サービス（省略時は全サービス）
        service: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // コマンドディスパッチ
    match cli.command {
        Commands::Attach {
            project,
            fast,
            service,
        } => {
            commands::attach::handle(&project, fast, &service).await?;
        }
        Commands::Up {
            project,
            exclude,
            fast,
        } => {
            commands::up::handle(&project, &exclude, fast).await?;
        }
        Commands::Down { project, service } => {
            commands::down::handle(&project, &service).await?;
        }
        Commands::Rm { project, service } => {
            commands::rm::handle(&project, &service).await?;
        }
    }

    Ok(())
}
