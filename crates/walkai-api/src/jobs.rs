//! Job submission

use crate::client::{WalkaiClient, ensure_success};
use crate::error::Result;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// Body of `POST /jobs/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRequest {
    pub image: String,
    pub gpu: String,
    pub storage: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secret_names: Vec<String>,
}

/// Identifiers returned for an accepted job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSubmission {
    pub job_id: Option<String>,
    pub pod: Option<String>,
}

impl WalkaiClient {
    /// Submit a job
    ///
    /// Returns `Ok(None)` when the API accepted the job but its body could not
    /// be read as JSON.
    pub async fn submit_job(&self, request: &JobRequest) -> Result<Option<JobSubmission>> {
        tracing::info!(image = %request.image, gpu = %request.gpu, "Submitting job");

        let response = self
            .send(self.request(Method::POST, "/jobs/").json(request))
            .await?;
        let response = ensure_success(response, "Job submission failed", None).await?;

        let body = response.text().await.unwrap_or_default();
        let Ok(payload) = serde_json::from_str::<Value>(&body) else {
            tracing::warn!("Job submission response was not valid JSON");
            return Ok(None);
        };

        Ok(Some(JobSubmission {
            job_id: text_field(&payload, "job_id"),
            pod: text_field(&payload, "pod"),
        }))
    }
}

/// Read a string or numeric field as text
fn text_field(payload: &Value, field: &str) -> Option<String> {
    match payload.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
