//! WalkAI CLI 設定の永続化
//!
//! レジストリ認証情報と WalkAI API 接続情報を TOML ファイルとして保存・読み込みします。
//! 保存先は [`ConfigStore`] に明示的に渡し、グローバルな状態は持ちません。

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "walkai";
const CONFIG_FILE_NAME: &str = "config.toml";

/// コンテナレジストリの接続情報
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// WalkAI API の接続情報
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub api_url: String,
    pub pat: String,
}

impl ApiConfig {
    /// 末尾の `/` を除いたベース URL
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_url", &self.api_url)
            .field("pat", &"<redacted>")
            .finish()
    }
}

/// 設定ファイル全体
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CliConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryConfig>,
    #[serde(rename = "walkai", skip_serializing_if = "Option::is_none")]
    pub walkai_api: Option<ApiConfig>,
}

impl CliConfig {
    /// `other` に含まれるセクションで上書きした設定を返す
    pub fn merged_with(self, other: CliConfig) -> CliConfig {
        CliConfig {
            registry: other.registry.or(self.registry),
            walkai_api: other.walkai_api.or(self.walkai_api),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    registry: Option<RawRegistry>,
    walkai: Option<RawApi>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRegistry {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawApi {
    api_url: Option<String>,
    pat: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value.ok_or_else(|| ConfigError::MissingField(field.to_string()))
}

impl TryFrom<RawConfig> for CliConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self> {
        if raw.registry.is_none() && raw.walkai.is_none() {
            return Err(ConfigError::MissingSection);
        }

        let registry = raw
            .registry
            .map(|r| -> Result<RegistryConfig> {
                Ok(RegistryConfig {
                    url: required(r.url, "registry.url")?,
                    username: required(r.username, "registry.username")?,
                    password: required(r.password, "registry.password")?,
                })
            })
            .transpose()?;

        let walkai_api = raw
            .walkai
            .map(|w| -> Result<ApiConfig> {
                Ok(ApiConfig {
                    api_url: required(w.api_url, "walkai.api_url")?,
                    pat: required(w.pat, "walkai.pat")?,
                })
            })
            .transpose()?;

        Ok(CliConfig {
            registry,
            walkai_api,
        })
    }
}

/// 既定の設定ファイルパス（例: `~/.config/walkai/config.toml`）
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// 設定ファイルの保存場所
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// プラットフォーム既定の場所を使用
    pub fn default_location() -> Result<Self> {
        default_config_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 保存済みの設定を読み込む（ファイルが無ければ `None`）
    pub fn load(&self) -> Result<Option<CliConfig>> {
        if !self.path.exists() {
            tracing::debug!("Config file not found at {}", self.path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let raw: RawConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        CliConfig::try_from(raw).map(Some)
    }

    /// 設定を保存（POSIX ではオーナーのみ読み書き可能にする）
    pub fn save(&self, config: &CliConfig) -> Result<&Path> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let content = toml::to_string(config)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            // 新規作成時から 0600
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(|e| self.io_error(e))?;

        // 既存ファイルは mode が効かないので絞り直す
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }

        file.write_all(content.as_bytes())
            .map_err(|e| self.io_error(e))?;

        tracing::debug!("Config saved to {}", self.path.display());
        Ok(&self.path)
    }

    /// 設定ファイルを削除（存在しなかった場合は `false`）
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        std::fs::remove_file(&self.path).map_err(|e| self.io_error(e))?;
        Ok(true)
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("config").join("config.toml"))
    }

    fn api_only() -> CliConfig {
        CliConfig {
            registry: None,
            walkai_api: Some(ApiConfig {
                api_url: "https://api.walkai.ai/v1".to_string(),
                pat: "walkai_pat_token".to_string(),
            }),
        }
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path().unwrap();
        assert!(path.ends_with("walkai/config.toml"));
    }

    #[test]
    fn test_load_returns_none_when_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(store_in(&temp_dir).load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(&temp_dir);

        let saved = store.save(&api_only()).unwrap().to_path_buf();
        assert_eq!(saved, store.path());

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("[walkai]"));
        assert!(content.contains(r#"api_url = "https://api.walkai.ai/v1""#));
        assert!(!content.contains("[registry]"));

        assert_eq!(store.load().unwrap(), Some(api_only()));
    }

    #[cfg(unix)]
    #[test]
    fn test_save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(&temp_dir);
        store.save(&api_only()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(&temp_dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "# ".repeat(512)).unwrap();
        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();

        store.save(&api_only()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        // 以前の内容は切り詰められる
        assert_eq!(store.load().unwrap(), Some(api_only()));
    }

    #[test]
    fn test_load_rejects_missing_sections() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(&temp_dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "invalid = true\n").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSection));
        assert!(err.to_string().contains("[walkai]"));
    }

    #[test]
    fn test_load_rejects_incomplete_section() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(&temp_dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "[walkai]\napi_url = \"https://api.walkai.ai\"\n").unwrap();

        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("walkai.pat"));
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(&temp_dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "[walkai\n").unwrap();

        assert!(matches!(store.load(), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_clear() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store_in(&temp_dir);
        assert!(!store.clear().unwrap());

        store.save(&api_only()).unwrap();
        assert!(store.clear().unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_merged_with_keeps_untouched_sections() {
        let registry = CliConfig {
            registry: Some(RegistryConfig {
                url: "registry.example.com/team".to_string(),
                username: "alice".to_string(),
                password: "hunter2".to_string(),
            }),
            walkai_api: None,
        };

        let merged = registry.clone().merged_with(api_only());
        assert_eq!(merged.registry, registry.registry);
        assert_eq!(merged.walkai_api, api_only().walkai_api);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = CliConfig {
            registry: Some(RegistryConfig {
                url: "registry.example.com".to_string(),
                username: "alice".to_string(),
                password: "hunter2".to_string(),
            }),
            walkai_api: api_only().walkai_api,
        };

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("walkai_pat_token"));
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let api = ApiConfig {
            api_url: "https://api.walkai.ai/".to_string(),
            pat: "t".to_string(),
        };
        assert_eq!(api.base_url(), "https://api.walkai.ai");
    }
}
