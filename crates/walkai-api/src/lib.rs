//! WalkAI API client
//!
//! Typed access to the WalkAI HTTP API used by the `walkai` CLI:
//! job submission, registry credential issuance, secrets and input volumes.
//!
//! All calls authenticate with the personal access token stored in the
//! `[walkai]` configuration section.

pub mod client;
pub mod error;
pub mod inputs;
pub mod jobs;
pub mod registry;
pub mod secrets;

pub use client::{DEFAULT_TIMEOUT, UPLOAD_TIMEOUT, WalkaiClient};
pub use error::{ApiError, Result};
pub use inputs::{InputVolume, VolumeObject};
pub use jobs::{JobRequest, JobSubmission};
pub use secrets::{SecretDetail, SecretSummary, parse_env_file};
