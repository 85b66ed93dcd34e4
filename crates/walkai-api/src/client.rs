//! Authenticated HTTP client for the WalkAI API

use crate::error::{ApiError, Result};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use walkai_config::ApiConfig;

/// Timeout applied to every API call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout applied to each presigned upload
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// WalkAI API client
///
/// Every request carries the personal access token as a bearer token.
#[derive(Clone)]
pub struct WalkaiClient {
    pub(crate) http: reqwest::Client,
    base_url: String,
    pat: String,
}

impl fmt::Debug for WalkaiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkaiClient")
            .field("base_url", &self.base_url)
            .field("pat", &"<redacted>")
            .finish()
    }
}

impl WalkaiClient {
    /// Create a client from the stored `[walkai]` configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("walkai/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            pat: config.pat.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);
        self.http.request(method, url).bearer_auth(&self.pat)
    }

    /// Build a request whose trailing path segments are percent-encoded
    pub(crate) fn request_segments(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ApiError::InvalidRequest(format!("Invalid WalkAI API URL '{}': {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::InvalidRequest(format!(
                    "Invalid WalkAI API URL '{}': cannot be a base.",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);

        tracing::debug!("{} {}", method, url);
        Ok(self.http.request(method, url).bearer_auth(&self.pat))
    }

    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(ApiError::Unreachable)?;
        tracing::debug!("WalkAI API responded with {}", response.status());
        Ok(response)
    }
}

/// Turn any response with status >= 400 into [`ApiError::Status`]
///
/// The detail is the trimmed body, then `default`, then `HTTP <code>`.
pub(crate) async fn ensure_success(
    response: Response,
    action: &str,
    default: Option<&str>,
) -> Result<Response> {
    let status = response.status();
    if status.as_u16() < 400 {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    let detail = if !body.is_empty() {
        body.to_string()
    } else if let Some(default) = default {
        default.to_string()
    } else {
        format!("HTTP {}", status.as_u16())
    };

    Err(ApiError::Status {
        action: action.to_string(),
        status: status.as_u16(),
        detail,
    })
}

/// Decode a JSON body, distinguishing broken JSON from an unexpected shape
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response, api: &str) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|_| ApiError::invalid(format!("{} returned invalid JSON.", api)))?;

    let value: serde_json::Value = serde_json::from_str(&body)
        .map_err(|_| ApiError::invalid(format!("{} returned invalid JSON.", api)))?;

    serde_json::from_value(value).map_err(|e| {
        tracing::debug!("Unexpected {} payload: {}", api, e);
        ApiError::invalid(format!("{} returned an unexpected payload.", api))
    })
}
