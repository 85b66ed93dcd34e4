mod commands;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use walkai_build::{ContainerClient, DEFAULT_BUILDER, ReferencePolicy};

#[derive(Parser)]
#[command(name = "walkai", version)]
#[command(
    about = "Opinionated tooling to build, push and run Python apps on WalkAI.",
    long_about = None
)]
struct Cli {
    /// 設定ファイルのパス（既定: <config_dir>/walkai/config.toml）
    #[arg(long, global = true, env = "WALKAI_CONFIG")]
    config: Option<PathBuf>,

    /// デバッグログを表示
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Buildpacks でコンテナイメージをビルド
    Build {
        /// pyproject.toml を含むプロジェクトディレクトリ
        #[arg(default_value = ".")]
        path: PathBuf,
        /// イメージ名（既定: walkai/<project>:latest）
        #[arg(short, long)]
        image: Option<String>,
        /// ビルド時の環境変数 (KEY=VALUE、複数指定可)
        #[arg(long = "env", value_name = "KEY=VALUE", value_parser = commands::parse_key_val)]
        env: Vec<(String, String)>,
        /// ビルドに渡す env ファイル（[tool.walkai].env_file より優先）
        #[arg(long)]
        env_file: Option<PathBuf>,
        /// 使用する buildpack builder
        #[arg(long, default_value = DEFAULT_BUILDER, hide = true)]
        builder: String,
    },
    /// イメージをレジストリへプッシュ
    Push {
        /// プッシュするローカルイメージ
        image: String,
        /// リモートリポジトリのパスを上書き
        #[arg(short, long)]
        repository: Option<String>,
        /// コンテナクライアント (docker / podman)
        #[arg(long, default_value = "docker")]
        client: ContainerClient,
        /// リモート参照の組み立て方 (inject-tag / compose-path)
        #[arg(long)]
        policy: Option<ReferencePolicy>,
    },
    /// WalkAI にジョブを投入
    Submit {
        /// pyproject.toml を含むプロジェクトディレクトリ
        #[arg(default_value = ".")]
        path: PathBuf,
        /// 実行するイメージ（既定: walkai/<project>:latest）
        #[arg(short, long)]
        image: Option<String>,
        /// ジョブに渡すシークレット名（複数指定可）
        #[arg(long = "secret", value_name = "NAME")]
        secrets: Vec<String>,
    },
    /// CLI 設定の管理
    #[command(subcommand)]
    Config(ConfigCommands),
    /// シークレットの管理
    #[command(subcommand)]
    Secrets(SecretsCommands),
    /// 入力ボリュームの管理
    #[command(subcommand)]
    Inputs(InputsCommands),
    /// バージョン情報を表示
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// 認証情報を保存（指定したセクションのみ更新）
    Save(SaveArgs),
    /// 保存済みの設定を表示（秘密情報はマスク）
    Show,
    /// 設定ファイルを削除
    Clear,
}

#[derive(Args)]
#[command(group(
    clap::ArgGroup::new("section")
        .required(true)
        .multiple(true)
        .args(["url", "api_url"])
))]
pub struct SaveArgs {
    /// レジストリ URL（例: registry.example.com/team）
    #[arg(long, requires_all = ["username", "password"])]
    pub url: Option<String>,
    /// レジストリのユーザー名
    #[arg(short, long, requires = "url")]
    pub username: Option<String>,
    /// レジストリのパスワード
    #[arg(short, long, requires = "url")]
    pub password: Option<String>,
    /// WalkAI API の URL（例: https://api.walkai.ai）
    #[arg(long, requires = "pat")]
    pub api_url: Option<String>,
    /// WalkAI のパーソナルアクセストークン
    #[arg(long, requires = "api_url")]
    pub pat: Option<String>,
}

#[derive(Subcommand)]
pub enum SecretsCommands {
    /// シークレット一覧
    List,
    /// シークレットのキー一覧
    Get { name: String },
    /// シークレットを作成（同名があれば置き換え）
    Create {
        name: String,
        /// KEY=VALUE（複数指定可）
        #[arg(long = "data", value_name = "KEY=VALUE", value_parser = commands::parse_key_val)]
        data: Vec<(String, String)>,
        /// .env 形式のファイルから読み込む
        #[arg(long)]
        env_file: Option<PathBuf>,
    },
    /// シークレットを削除
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum InputsCommands {
    /// 入力ボリューム一覧
    List,
    /// ボリューム内のオブジェクト一覧
    Objects {
        /// ボリューム ID
        id: u64,
    },
    /// 入力ボリュームを作成
    Create {
        /// ストレージ単位数
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        size: u32,
    },
    /// ファイルをボリュームへアップロード
    Upload {
        /// ボリューム ID
        id: u64,
        /// アップロードするファイル（省略時は [tool.walkai].inputs）
        files: Vec<PathBuf>,
        /// inputs を読み込むプロジェクトディレクトリ
        #[arg(long, default_value = ".")]
        project: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            ExitCode::FAILURE
        }
    }
}

/// ログは stderr へ（既定 warn、-v で debug、RUST_LOG も有効）
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config;
    let store = || commands::config_store(config_path.clone());

    match cli.command {
        Commands::Build {
            path,
            image,
            env,
            env_file,
            builder,
        } => commands::build::handle(&path, image, env, env_file, &builder),
        Commands::Push {
            image,
            repository,
            client,
            policy,
        } => {
            commands::push::handle(&store()?, &image, repository.as_deref(), client, policy).await
        }
        Commands::Submit {
            path,
            image,
            secrets,
        } => commands::submit::handle(&store()?, &path, image, secrets).await,
        Commands::Config(cmd) => commands::config::handle(&store()?, cmd),
        Commands::Secrets(cmd) => commands::secrets::handle(&store()?, cmd).await,
        Commands::Inputs(cmd) => commands::inputs::handle(&store()?, cmd).await,
        Commands::Version => {
            println!("walkai {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
