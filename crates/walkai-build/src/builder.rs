use crate::context::BuildContext;
use crate::descriptor::BuildDescriptor;
use crate::error::{BuildError, BuildResult};
use crate::runner::{CommandRunner, Invocation};
use std::path::{Path, PathBuf};
use walkai_core::{ProjectDescriptor, load_project};

/// `pack` CLI の実行ファイル名
pub const PACK_PROGRAM: &str = "pack";

pub const DEFAULT_BUILDER: &str = "heroku/builder:24";

/// ビルド時の追加オプション
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// 省略時はプロジェクト名から生成
    pub image: Option<String>,
    /// `--env KEY=VALUE` として順に渡す
    pub env: Vec<(String, String)>,
    /// 省略時は `[tool.walkai].env_file`
    pub env_file: Option<PathBuf>,
}

/// `pack build` によるイメージビルド
pub struct ImageBuilder<R> {
    runner: R,
    builder: String,
}

impl<R: CommandRunner> ImageBuilder<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            builder: DEFAULT_BUILDER.to_string(),
        }
    }

    /// 使用する buildpack builder を変更
    pub fn with_builder(mut self, builder: impl Into<String>) -> Self {
        self.builder = builder.into();
        self
    }

    fn is_heroku_builder(&self) -> bool {
        self.builder.to_lowercase().starts_with("heroku/")
    }

    /// プロジェクトディレクトリを読み込んでビルドし、イメージ参照を返す
    pub fn build(&self, project_dir: &Path, options: &BuildOptions) -> BuildResult<String> {
        let project = load_project(project_dir)?;
        self.build_project(&project, options)
    }

    /// 読み込み済みのプロジェクトをビルド
    pub fn build_project(
        &self,
        project: &ProjectDescriptor,
        options: &BuildOptions,
    ) -> BuildResult<String> {
        let image = options
            .image
            .clone()
            .unwrap_or_else(|| project.default_image());

        let env_file = options.env_file.as_ref().or(project.env_file.as_ref());
        if let Some(env_file) = env_file
            && !env_file.exists()
        {
            return Err(BuildError::EnvFileNotFound(env_file.clone()));
        }

        let descriptor = BuildDescriptor::from_packages(
            project.os_dependencies.iter().map(String::as_str),
        );

        let mut env = options.env.clone();
        if let Some(descriptor) = &descriptor
            && !self.is_heroku_builder()
        {
            env.push(("BP_APT_PACKAGES".to_string(), descriptor.packages().join(" ")));
        }

        tracing::info!("Building image: {}", image);

        let context = BuildContext::stage(project)?;
        if let Some(descriptor) = &descriptor
            && self.is_heroku_builder()
        {
            context.write_descriptor(descriptor)?;
        }

        let invocation = self.build_command(&image, context.path(), &env, env_file);
        self.run(&invocation)?;

        tracing::info!("Image built: {}", image);
        Ok(image)
    }

    fn build_command(
        &self,
        image: &str,
        context: &Path,
        env: &[(String, String)],
        env_file: Option<&PathBuf>,
    ) -> Invocation {
        let mut invocation = Invocation::new(PACK_PROGRAM)
            .args(["build", image, "--path"])
            .arg(context.to_string_lossy())
            .args(["--builder", self.builder.as_str()])
            .args(["--pull-policy", "if-not-present"]);

        for (key, value) in env {
            invocation = invocation.arg("--env").arg(format!("{}={}", key, value));
        }

        if let Some(env_file) = env_file {
            invocation = invocation
                .arg("--env-file")
                .arg(env_file.to_string_lossy());
        }

        invocation
    }

    fn run(&self, invocation: &Invocation) -> BuildResult<()> {
        tracing::debug!("Running: {}", invocation);

        let status = self.runner.run(invocation).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BuildError::BuilderNotInstalled
            } else {
                BuildError::Io(e)
            }
        })?;

        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => Err(BuildError::BuilderFailed(code)),
            None => Err(BuildError::BuilderTerminated),
        }
    }
}
