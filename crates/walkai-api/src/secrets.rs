//! Secrets management
//!
//! Secret values are write-only: the API only ever returns secret names and
//! their key names.

use crate::client::{WalkaiClient, ensure_success, read_json};
use crate::error::{ApiError, Result};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const SECRETS_API: &str = "Secrets API";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SecretSummary {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretDetail {
    pub name: String,
    pub keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSecretDetail {
    name: Option<String>,
    #[serde(default)]
    keys: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct CreateSecret<'a> {
    name: &'a str,
    data: &'a BTreeMap<String, String>,
}

impl WalkaiClient {
    pub async fn list_secrets(&self) -> Result<Vec<SecretSummary>> {
        let response = self.send(self.request(Method::GET, "/secrets/")).await?;
        let response = ensure_success(response, "Failed to list secrets", None).await?;
        read_json(response, SECRETS_API).await
    }

    pub async fn get_secret(&self, name: &str) -> Result<SecretDetail> {
        let request = self.request_segments(Method::GET, &["secrets", require_name(name)?])?;
        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(format!(
                "Secret '{}' was not found.",
                name
            )));
        }
        let response = ensure_success(response, "Failed to fetch secret", None).await?;

        let raw: RawSecretDetail = read_json(response, SECRETS_API).await?;
        Ok(SecretDetail {
            name: raw.name.unwrap_or_else(|| name.to_string()),
            keys: raw.keys.unwrap_or_default(),
        })
    }

    /// Create or replace a secret
    pub async fn create_secret(&self, name: &str, data: &BTreeMap<String, String>) -> Result<()> {
        require_name(name)?;
        if data.is_empty() {
            return Err(ApiError::InvalidRequest(
                "Provide at least one KEY=VALUE pair or an env file.".to_string(),
            ));
        }

        tracing::debug!("Creating secret {} with {} key(s)", name, data.len());
        let body = CreateSecret { name, data };
        let response = self
            .send(self.request(Method::POST, "/secrets/").json(&body))
            .await?;
        ensure_success(response, "Failed to create secret", None).await?;
        Ok(())
    }

    pub async fn delete_secret(&self, name: &str) -> Result<()> {
        let request = self.request_segments(Method::DELETE, &["secrets", require_name(name)?])?;
        let response = self.send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(());
        }
        ensure_success(response, "Failed to delete secret", Some("Secret not found.")).await?;
        Ok(())
    }
}

fn require_name(name: &str) -> Result<&str> {
    if name.trim().is_empty() {
        return Err(ApiError::InvalidRequest(
            "Secret name cannot be empty.".to_string(),
        ));
    }
    Ok(name)
}

/// Parse a `.env` style file
///
/// Blank lines and `#` comments are skipped, an `export ` prefix is allowed
/// and matching surrounding quotes are removed from values.
pub fn parse_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::FileNotFound(path.to_path_buf())
        } else {
            ApiError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let invalid = |line: usize, reason: &str| ApiError::EnvFile {
        path: path.to_path_buf(),
        line,
        reason: reason.to_string(),
    };

    let mut data = BTreeMap::new();
    for (idx, raw_line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let mut line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line
            .get(..7)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("export "))
        {
            line = line[7..].trim_start();
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(invalid(line_no, "missing '='."));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(invalid(line_no, "missing key."));
        }

        data.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    Ok(data)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
