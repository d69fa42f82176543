mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tcflow")]
#[command(about = "Tencent Cloud のネットワークとインスタンスを宣言的に管理", long_about = None)]
struct Cli {
    /// リソース定義ファイル（省略時は自動検出）
    #[arg(short, long, global = true, env = "TCFLOW_CONFIG_PATH")]
    file: Option<PathBuf>,

    /// デバッグログを表示（API リクエスト/レスポンスを含む）
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 定義と状態ファイルを比較して実行計画を表示
    Plan {
        /// 定義から消えたリソースを削除対象に含める
        #[arg(long)]
        prune: bool,
    },
    /// 実行計画を適用
    Apply {
        /// 定義から消えたリソースを削除する
        #[arg(long)]
        prune: bool,
        /// 確認なしで適用
        #[arg(short, long)]
        yes: bool,
    },
    /// 状態ファイルにある全リソースを削除
    Destroy {
        /// 確認なしで削除
        #[arg(short, long)]
        yes: bool,
    },
    /// 状態ファイルの内容を表示
    Show {
        /// クラウドから最新の状態を読み直して保存
        #[arg(short, long)]
        refresh: bool,
    },
    /// VPC 一覧（サブネット ID 付き）
    Vpcs {
        /// VPC ID で絞り込み
        #[arg(long)]
        id: Option<String>,
        /// VPC 名で絞り込み
        #[arg(long)]
        name: Option<String>,
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// 認証情報を確認
    Auth,
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログは stderr、RUST_LOG が優先
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let file = cli.file.as_deref();
    match cli.command {
        Commands::Plan { prune } => commands::plan::handle(file, prune).await,
        Commands::Apply { prune, yes } => commands::apply::handle(file, prune, yes).await,
        Commands::Destroy { yes } => commands::destroy::handle(yes).await,
        Commands::Show { refresh } => commands::show::handle(refresh).await,
        Commands::Vpcs { id, name, json } => {
            commands::vpcs::handle(id.as_deref(), name.as_deref(), json).await
        }
        Commands::Auth => commands::auth::handle().await,
        Commands::Version => {
            println!("tcflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
