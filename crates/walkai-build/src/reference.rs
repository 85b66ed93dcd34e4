//! イメージ参照の正規化
//!
//! ローカルのイメージ参照とレジストリ URL から、`tag`/`push` に使うリモート参照を組み立てます。
//! 組み立て方は [`ReferencePolicy`] で切り替えます。

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 参照の組み立てに失敗した理由
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("local image reference cannot be empty")]
    EmptyLocal,

    #[error("Could not derive image name from '{0}'. Please provide a valid image.")]
    InvalidLocal(String),

    #[error("Remote registry reference cannot be empty.")]
    EmptyRemote,

    #[error("Could not derive remote repository from '{0}'.")]
    InvalidRemote(String),

    #[error("registry URL may not be empty")]
    EmptyRegistryUrl,

    #[error("registry host is missing")]
    MissingRegistryHost,
}

pub type Result<T> = std::result::Result<T, ReferenceError>;

/// リモート参照の組み立て方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// レジストリ側のリポジトリを固定し、ローカルのイメージ名をタグとして埋め込む
    ///
    /// `ghcr.io/acme/demo:1.0` + `123.dkr.ecr.aws/team` -> `123.dkr.ecr.aws/team:demo`
    InjectTag,
    /// レジストリの名前空間の下にローカル参照をそのまま置く
    ///
    /// `demo:latest` + `registry.example.com/team` -> `registry.example.com/team/demo:latest`
    ComposePath,
}

impl ReferencePolicy {
    /// ローカル参照とレジストリ URL からリモート参照を生成
    pub fn remote_reference(
        &self,
        local: &str,
        registry_url: &str,
        repository: Option<&str>,
    ) -> Result<String> {
        if local.trim().is_empty() {
            return Err(ReferenceError::EmptyLocal);
        }

        match self {
            ReferencePolicy::InjectTag => inject_tag(local, registry_url, repository),
            ReferencePolicy::ComposePath => compose_path(local, registry_url, repository),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferencePolicy::InjectTag => "inject-tag",
            ReferencePolicy::ComposePath => "compose-path",
        }
    }
}

impl fmt::Display for ReferencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferencePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inject-tag" => Ok(ReferencePolicy::InjectTag),
            "compose-path" => Ok(ReferencePolicy::ComposePath),
            other => Err(format!(
                "Unknown reference policy '{}'. Use 'inject-tag' or 'compose-path'.",
                other
            )),
        }
    }
}

/// 前後の空白、先頭のスキーム1つ、末尾の `/` を除去
///
/// スキーム除去後に露出した空白と `/` も変化しなくなるまで落とす。
pub fn normalize_registry_url(url: &str) -> String {
    let trimmed = url.trim();
    let mut rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    loop {
        let next = rest.trim().trim_end_matches('/');
        if next == rest {
            return next.to_string();
        }
        rest = next;
    }
}

/// `login` に使うレジストリホスト（最初の `/` より前）
pub fn registry_host(registry_url: &str) -> Result<String> {
    let (host, _) = split_registry(registry_url)?;
    Ok(host)
}

fn split_registry(registry_url: &str) -> Result<(String, Option<String>)> {
    let normalized = normalize_registry_url(registry_url);
    if normalized.is_empty() {
        return Err(ReferenceError::EmptyRegistryUrl);
    }

    let (host, namespace) = match normalized.split_once('/') {
        Some((host, rest)) => (host, Some(rest)),
        None => (normalized.as_str(), None),
    };
    if host.is_empty() {
        return Err(ReferenceError::MissingRegistryHost);
    }

    let namespace = namespace
        .map(|ns| ns.trim_end_matches('/'))
        .filter(|ns| !ns.is_empty())
        .map(str::to_string);

    Ok((host.to_string(), namespace))
}

/// ローカル参照から短い名前を抽出
///
/// `ns/name:tag` -> `name`, `name@sha256:...` -> `name`
pub fn short_name(local: &str) -> Result<String> {
    let trimmed = local.trim();
    if trimmed.is_empty() {
        return Err(ReferenceError::EmptyLocal);
    }

    let without_digest = trimmed.split('@').next().unwrap_or_default();
    let last_segment = without_digest.rsplit('/').next().unwrap_or_default();
    let name = last_segment.split(':').next().unwrap_or_default();

    if name.is_empty() {
        return Err(ReferenceError::InvalidLocal(local.to_string()));
    }
    Ok(name.to_string())
}

fn remote_repository(target: &str) -> Result<String> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(ReferenceError::EmptyRemote);
    }

    let mut repository = trimmed.split('@').next().unwrap_or_default();
    if let Some(colon) = repository.rfind(':') {
        let after_last_slash = repository.rfind('/').is_none_or(|slash| colon > slash);
        if after_last_slash {
            repository = &repository[..colon];
        }
    }

    if repository.is_empty() {
        return Err(ReferenceError::InvalidRemote(target.to_string()));
    }
    Ok(repository.to_string())
}

fn inject_tag(local: &str, registry_url: &str, repository: Option<&str>) -> Result<String> {
    let name = short_name(local)?;

    let base = normalize_registry_url(registry_url);
    let target = match repository.map(|r| r.trim().trim_matches('/')) {
        Some(repo) if !repo.is_empty() => format!("{}/{}", base, repo),
        _ => base,
    };

    let repository = remote_repository(&target)?;
    Ok(format!("{}:{}", repository, name))
}

fn compose_path(local: &str, registry_url: &str, repository: Option<&str>) -> Result<String> {
    let (host, namespace) = split_registry(registry_url)?;

    let candidate = repository.unwrap_or(local).trim().trim_start_matches('/');
    let candidate = match namespace {
        Some(ns) if candidate.is_empty() => ns,
        Some(ns) => format!("{}/{}", ns, candidate),
        None => candidate.to_string(),
    };

    if candidate.is_empty() {
        Ok(host)
    } else {
        Ok(format!("{}/{}", host, candidate))
    }
}
