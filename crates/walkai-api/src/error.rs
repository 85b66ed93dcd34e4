use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed to reach WalkAI API: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The API answered with a 4xx/5xx status
    #[error("{action}: {detail}")]
    Status {
        action: String,
        status: u16,
        detail: String,
    },

    #[error("{0}")]
    NotFound(String),

    /// The response body did not have the expected shape
    #[error("{0}")]
    InvalidResponse(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Invalid line {line} in {path}: {reason}")]
    EnvFile {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to upload file {name}: {source}")]
    Upload {
        name: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidResponse(message.into())
    }

    /// HTTP status code, if the error came from an API response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
