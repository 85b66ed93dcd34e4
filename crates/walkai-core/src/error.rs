use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectConfigError {
    #[error("No pyproject.toml found at {0}.")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("The pyproject.toml is missing the [tool.walkai] section.")]
    MissingSection,

    #[error("The [tool.walkai] section must define an 'entrypoint' string.")]
    MissingEntrypoint,

    #[error("The 'os_dependencies' field must be a list of strings if provided.")]
    InvalidOsDependencies,

    #[error("The 'gpu' field must be a non-empty string if provided.")]
    InvalidGpu,

    #[error("The 'inputs' field must be a list of relative paths if provided.")]
    InvalidInputs,

    #[error("Input path declared at {0} does not exist.")]
    InputNotFound(PathBuf),

    #[error("The 'storage' field must be an integer.")]
    InvalidStorage,

    #[error("The 'storage' field must be greater than zero.")]
    NonPositiveStorage,

    #[error("The 'env_file' field must be a path string if provided.")]
    InvalidEnvFile,

    #[error("Project configuration must define [tool.walkai].gpu to submit a job.")]
    MissingGpu,
}

pub type Result<T> = std::result::Result<T, ProjectConfigError>;
