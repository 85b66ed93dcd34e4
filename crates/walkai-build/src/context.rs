use crate::descriptor::{BuildDescriptor, DESCRIPTOR_FILE};
use crate::error::{BuildError, BuildResult};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkai_core::ProjectDescriptor;
use walkdir::WalkDir;

/// ビルドコンテキストにコピーしないディレクトリ名（どの階層でも除外）
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    "env",
    ".venv",
];

pub const PROCFILE: &str = "Procfile";

/// 一時ディレクトリに展開したビルドコンテキスト
///
/// drop 時にディレクトリごと削除されます。
pub struct BuildContext {
    dir: TempDir,
}

impl BuildContext {
    /// プロジェクトをコピーし、`Procfile` を書き出す
    pub fn stage(project: &ProjectDescriptor) -> BuildResult<Self> {
        let dir = tempfile::Builder::new().prefix("walkai-build-").tempdir()?;
        tracing::debug!(
            "Staging build context from {} into {}",
            project.root.display(),
            dir.path().display()
        );

        let copied = copy_project(&project.root, dir.path())?;
        tracing::debug!("Build context staged: {} bytes", copied);
        Self::check_context_size(copied);

        fs::write(
            dir.path().join(PROCFILE),
            format!("web: {}\n", project.entrypoint),
        )?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// OS パッケージ用の `project.toml` を書き出す
    ///
    /// 既に `project.toml` がある場合は上書きせずエラーにします。
    pub fn write_descriptor(&self, descriptor: &BuildDescriptor) -> BuildResult<PathBuf> {
        let path = self.path().join(DESCRIPTOR_FILE);
        if path.exists() {
            return Err(BuildError::DescriptorExists(path));
        }

        fs::write(&path, descriptor.to_toml()?)?;
        tracing::debug!(
            "Wrote {} with {} package(s)",
            DESCRIPTOR_FILE,
            descriptor.packages().len()
        );
        Ok(path)
    }

    fn check_context_size(size: u64) {
        const MAX_CONTEXT_SIZE: u64 = 500 * 1024 * 1024; // 500MB

        if size > MAX_CONTEXT_SIZE {
            tracing::warn!(
                "Build context is large ({}MB). Consider moving data files out of the project directory.",
                size / 1024 / 1024
            );
        }
    }
}

fn is_excluded(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
}

/// `src` 配下を `dst` にコピーし、コピーしたバイト数を返す
///
/// シンボリックリンクは辿ってリンク先の内容をコピーします。
/// リンク切れやループは `BuildError::Staging` になります。
fn copy_project(src: &Path, dst: &Path) -> BuildResult<u64> {
    let mut copied = 0;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry));

    for entry in walker {
        let entry = entry.map_err(|e| BuildError::Staging {
            path: src.to_path_buf(),
            source: e,
        })?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);

        if entry.path_is_symlink() {
            tracing::debug!("Following symbolic link {}", entry.path().display());
        }
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            copied += fs::copy(entry.path(), &target)?;
        }
    }

    Ok(copied)
}
