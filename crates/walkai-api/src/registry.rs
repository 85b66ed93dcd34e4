//! Registry credential issuance

use crate::client::{WalkaiClient, ensure_success};
use crate::error::{ApiError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Method;
use serde::Deserialize;
use walkai_config::RegistryConfig;

const MALFORMED: &str = "WalkAI API returned malformed registry credentials.";

#[derive(Debug, Deserialize)]
struct RegistryResponse {
    token: Option<String>,
    ecr_arn: Option<String>,
}

impl WalkaiClient {
    /// Fetch short-lived push credentials for the WalkAI registry
    ///
    /// The API answers with a base64 `user:password` token and the registry
    /// address in `ecr_arn`.
    pub async fn registry_credentials(&self) -> Result<RegistryConfig> {
        let response = self
            .send(self.request(Method::GET, "/registry"))
            .await?;
        let response =
            ensure_success(response, "Failed to obtain registry credentials", None).await?;

        let body = response
            .text()
            .await
            .map_err(|_| ApiError::invalid(MALFORMED))?;
        let payload: RegistryResponse =
            serde_json::from_str(&body).map_err(|_| ApiError::invalid(MALFORMED))?;

        let token = required(payload.token, "token")?;
        let url = required(payload.ecr_arn, "ecr_arn")?;
        let (username, password) = decode_token(&token)?;

        tracing::debug!("Obtained registry credentials for {}", url);
        Ok(RegistryConfig {
            url,
            username,
            password,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            ApiError::invalid(format!(
                "WalkAI API response missing registry.{} field.",
                field
            ))
        })
}

fn decode_token(token: &str) -> Result<(String, String)> {
    let decoded = STANDARD
        .decode(token.trim())
        .map_err(|_| ApiError::invalid(MALFORMED))?;
    let decoded = String::from_utf8(decoded).map_err(|_| ApiError::invalid(MALFORMED))?;

    match decoded.split_once(':') {
        Some((user, pass)) if !user.is_empty() => Ok((user.to_string(), pass.to_string())),
        _ => Err(ApiError::invalid(MALFORMED)),
    }
}
