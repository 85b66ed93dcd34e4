//! プロジェクト記述子の読み込み
//!
//! `pyproject.toml` の `[tool.walkai]` セクションを検証し、[`ProjectDescriptor`] を生成します。
//! 不正なフィールドがあれば最初の1件でエラーを返します（部分的な復旧は行いません）。

use crate::error::{ProjectConfigError, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use toml::{Table, Value};
use tracing::{debug, instrument};

/// プロジェクトルートに置かれる設定ファイル名
pub const PROJECT_FILE: &str = "pyproject.toml";

/// `storage` 未指定時のストレージ単位数
const DEFAULT_STORAGE: u32 = 1;

static INVALID_IMAGE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_.-]+").expect("image name pattern is valid"));

/// `[tool.walkai]` から抽出したプロジェクト設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub project_name: String,
    pub entrypoint: String,
    /// トリム・重複除去済み（初出順を保持）
    pub os_dependencies: Vec<String>,
    /// 絶対パス
    pub root: PathBuf,
    pub gpu: Option<String>,
    /// 存在確認済みの絶対パス
    pub inputs: Vec<PathBuf>,
    pub storage: u32,
    pub env_file: Option<PathBuf>,
}

impl ProjectDescriptor {
    /// プロジェクト名から既定のイメージ名を生成
    ///
    /// # Examples
    /// - `demo` -> `walkai/demo:latest`
    /// - `My Cool_App!` -> `walkai/my-cool_app:latest`
    pub fn default_image(&self) -> String {
        let lowered = self.project_name.to_lowercase();
        let sanitized = INVALID_IMAGE_CHARS.replace_all(&lowered, "-");
        let sanitized = sanitized.trim_matches('-');

        let base = if sanitized.is_empty() {
            self.root
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default()
        } else {
            sanitized.to_string()
        };

        format!("walkai/{}:latest", base)
    }

    /// ジョブ投入時に必須となる GPU クラスを取得
    pub fn require_gpu(&self) -> Result<&str> {
        self.gpu.as_deref().ok_or(ProjectConfigError::MissingGpu)
    }
}

#[derive(Debug, Default, Deserialize)]
struct PyProject {
    #[serde(default)]
    project: Option<ProjectTable>,
    #[serde(default)]
    tool: Option<Table>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectTable {
    name: Option<String>,
}

/// プロジェクトディレクトリから記述子をロード
#[instrument(skip(project_dir), fields(project_dir = %project_dir.display()))]
pub fn load_project(project_dir: &Path) -> Result<ProjectDescriptor> {
    let root = project_dir.canonicalize().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProjectConfigError::NotFound(project_dir.join(PROJECT_FILE))
        } else {
            ProjectConfigError::Io {
                path: project_dir.to_path_buf(),
                source: e,
            }
        }
    })?;

    let path = root.join(PROJECT_FILE);
    if !path.is_file() {
        return Err(ProjectConfigError::NotFound(path));
    }

    let content = std::fs::read_to_string(&path).map_err(|e| ProjectConfigError::Io {
        path: path.clone(),
        source: e,
    })?;

    let document: PyProject = toml::from_str(&content).map_err(|e| ProjectConfigError::Parse {
        path: path.clone(),
        message: e.to_string(),
    })?;

    let section = document
        .tool
        .as_ref()
        .and_then(|tool| tool.get("walkai"))
        .and_then(Value::as_table)
        .ok_or(ProjectConfigError::MissingSection)?;

    let project_name = document
        .project
        .and_then(|p| p.name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            root.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

    let descriptor = ProjectDescriptor {
        project_name,
        entrypoint: parse_entrypoint(section)?,
        os_dependencies: parse_os_dependencies(section)?,
        gpu: parse_gpu(section)?,
        inputs: parse_inputs(section, &root)?,
        storage: parse_storage(section)?,
        env_file: parse_env_file(section, &root)?,
        root,
    };

    debug!(
        project = %descriptor.project_name,
        os_dependencies = descriptor.os_dependencies.len(),
        inputs = descriptor.inputs.len(),
        "Project descriptor loaded"
    );

    Ok(descriptor)
}

fn parse_entrypoint(section: &Table) -> Result<String> {
    section
        .get("entrypoint")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ProjectConfigError::MissingEntrypoint)
}

fn parse_os_dependencies(section: &Table) -> Result<Vec<String>> {
    let Some(value) = section.get("os_dependencies") else {
        return Ok(Vec::new());
    };

    let items = string_list(value).ok_or(ProjectConfigError::InvalidOsDependencies)?;
    Ok(dedup_packages(items))
}

/// パッケージ名をトリムし、空要素と重複を除去（初出順を保持）
pub fn dedup_packages<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(str::trim)
        .filter(|pkg| !pkg.is_empty())
        .filter(|pkg| seen.insert(*pkg))
        .map(str::to_string)
        .collect()
}

fn parse_gpu(section: &Table) -> Result<Option<String>> {
    match section.get("gpu") {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Some(s.to_string()))
            .ok_or(ProjectConfigError::InvalidGpu),
    }
}

fn parse_inputs(section: &Table, root: &Path) -> Result<Vec<PathBuf>> {
    let Some(value) = section.get("inputs") else {
        return Ok(Vec::new());
    };

    let items = string_list(value).ok_or(ProjectConfigError::InvalidInputs)?;
    items
        .into_iter()
        .map(|item| {
            let candidate = root.join(item);
            candidate
                .canonicalize()
                .map_err(|_| ProjectConfigError::InputNotFound(candidate))
        })
        .collect()
}

fn parse_storage(section: &Table) -> Result<u32> {
    match section.get("storage") {
        None => Ok(DEFAULT_STORAGE),
        Some(Value::Integer(n)) if *n <= 0 => Err(ProjectConfigError::NonPositiveStorage),
        Some(Value::Integer(n)) => u32::try_from(*n).map_err(|_| ProjectConfigError::InvalidStorage),
        Some(_) => Err(ProjectConfigError::InvalidStorage),
    }
}

fn parse_env_file(section: &Table, root: &Path) -> Result<Option<PathBuf>> {
    match section.get("env_file") {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .map(|s| Some(root.join(s.trim())))
            .ok_or(ProjectConfigError::InvalidEnvFile),
    }
}

fn string_list(value: &Value) -> Option<Vec<&str>> {
    value.as_array()?.iter().map(Value::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_project(body: &str) -> (TempDir, PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = temp_dir.path().join("demo");
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join(PROJECT_FILE), body).unwrap();
        (temp_dir, project_dir)
    }

    #[test]
    fn test_load_full_descriptor() {
        let (_tmp, dir) = write_project(
            r#"
[project]
name = "demo"

[tool.walkai]
entrypoint = "  python main.py "
os_dependencies = ["git", "curl"]
gpu = " 1g.10gb "
storage = 5
inputs = ["data/sample.txt"]
env_file = ".env"
"#,
        );
        fs::create_dir(dir.join("data")).unwrap();
        fs::write(dir.join("data/sample.txt"), "hello").unwrap();

        let project = load_project(&dir).unwrap();
        assert_eq!(project.project_name, "demo");
        assert_eq!(project.entrypoint, "python main.py");
        assert_eq!(project.os_dependencies, vec!["git", "curl"]);
        assert_eq!(project.gpu.as_deref(), Some("1g.10gb"));
        assert_eq!(project.storage, 5);
        assert_eq!(project.inputs.len(), 1);
        assert!(project.inputs[0].is_absolute());
        assert!(project.inputs[0].ends_with("data/sample.txt"));
        assert_eq!(project.env_file, Some(project.root.join(".env")));
        assert!(project.root.is_absolute());
    }

    #[test]
    fn test_os_dependencies_deduplicated_in_order() {
        let (_tmp, dir) = write_project(
            r#"
[tool.walkai]
entrypoint = "python main.py"
os_dependencies = [" git ", "curl", "git", ""]
"#,
        );

        let project = load_project(&dir).unwrap();
        assert_eq!(project.os_dependencies, vec!["git", "curl"]);
    }

    #[test]
    fn test_defaults_when_optional_fields_missing() {
        let (_tmp, dir) = write_project("[tool.walkai]\nentrypoint = \"python main.py\"\n");

        let project = load_project(&dir).unwrap();
        assert_eq!(project.project_name, "demo");
        assert!(project.os_dependencies.is_empty());
        assert!(project.gpu.is_none());
        assert!(project.inputs.is_empty());
        assert_eq!(project.storage, 1);
        assert!(project.env_file.is_none());
    }

    #[test]
    fn test_missing_project_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = load_project(temp_dir.path());
        assert!(matches!(result, Err(ProjectConfigError::NotFound(_))));
    }

    #[test]
    fn test_missing_walkai_section() {
        let (_tmp, dir) = write_project("[project]\nname = \"demo\"\n");
        let result = load_project(&dir);
        assert!(matches!(result, Err(ProjectConfigError::MissingSection)));
    }

    #[test]
    fn test_invalid_toml() {
        let (_tmp, dir) = write_project("[tool.walkai\nentrypoint = ");
        let result = load_project(&dir);
        assert!(matches!(result, Err(ProjectConfigError::Parse { .. })));
    }

    #[test]
    fn test_entrypoint_required() {
        let (_tmp, dir) = write_project("[tool.walkai]\nentrypoint = \"   \"\n");
        let err = load_project(&dir).unwrap_err();
        assert!(matches!(err, ProjectConfigError::MissingEntrypoint));
        assert!(err.to_string().contains("'entrypoint'"));
    }

    #[test]
    fn test_os_dependencies_must_be_strings() {
        let (_tmp, dir) = write_project(
            "[tool.walkai]\nentrypoint = \"python main.py\"\nos_dependencies = [\"git\", 3]\n",
        );
        let result = load_project(&dir);
        assert!(matches!(
            result,
            Err(ProjectConfigError::InvalidOsDependencies)
        ));
    }

    #[test]
    fn test_blank_gpu_rejected() {
        let (_tmp, dir) =
            write_project("[tool.walkai]\nentrypoint = \"python main.py\"\ngpu = \"  \"\n");
        let result = load_project(&dir);
        assert!(matches!(result, Err(ProjectConfigError::InvalidGpu)));
    }

    #[test]
    fn test_storage_validation() {
        let (_tmp, dir) =
            write_project("[tool.walkai]\nentrypoint = \"python main.py\"\nstorage = 0\n");
        assert!(matches!(
            load_project(&dir),
            Err(ProjectConfigError::NonPositiveStorage)
        ));

        let (_tmp, dir) =
            write_project("[tool.walkai]\nentrypoint = \"python main.py\"\nstorage = \"two\"\n");
        assert!(matches!(
            load_project(&dir),
            Err(ProjectConfigError::InvalidStorage)
        ));
    }

    #[test]
    fn test_missing_input_path() {
        let (_tmp, dir) = write_project(
            "[tool.walkai]\nentrypoint = \"python main.py\"\ninputs = [\"missing.csv\"]\n",
        );
        let err = load_project(&dir).unwrap_err();
        assert!(matches!(err, ProjectConfigError::InputNotFound(_)));
        assert!(err.to_string().contains("missing.csv"));
    }

    #[test]
    fn test_default_image_sanitizes_name() {
        let (_tmp, dir) = write_project(
            "[project]\nname = \"My Cool_App!\"\n[tool.walkai]\nentrypoint = \"python main.py\"\n",
        );
        let project = load_project(&dir).unwrap();
        assert_eq!(project.default_image(), "walkai/my-cool_app:latest");
    }

    #[test]
    fn test_default_image_falls_back_to_root_name() {
        let (_tmp, dir) =
            write_project("[project]\nname = \"!!!\"\n[tool.walkai]\nentrypoint = \"x\"\n");
        let project = load_project(&dir).unwrap();
        assert_eq!(project.default_image(), "walkai/demo:latest");
    }

    #[test]
    fn test_require_gpu() {
        let (_tmp, dir) = write_project("[tool.walkai]\nentrypoint = \"python main.py\"\n");
        let project = load_project(&dir).unwrap();
        let err = project.require_gpu().unwrap_err();
        assert!(err.to_string().contains("gpu"));
    }

    #[test]
    fn test_dedup_packages() {
        assert_eq!(
            dedup_packages(["git", "curl", "git"]),
            vec!["git".to_string(), "curl".to_string()]
        );
    }
}
