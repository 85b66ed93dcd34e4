use crate::pusher::ContainerClient;
use crate::reference::ReferenceError;
use std::path::PathBuf;
use thiserror::Error;
use walkai_core::ProjectConfigError;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Project(#[from] ProjectConfigError),

    #[error("Environment file '{0}' not found.")]
    EnvFileNotFound(PathBuf),

    #[error(
        "Found an existing project.toml at {0}. walkai generates project.toml to install OS dependencies; remove the file or drop [tool.walkai].os_dependencies."
    )]
    DescriptorExists(PathBuf),

    #[error("Failed to render project.toml: {0}")]
    Descriptor(#[from] toml::ser::Error),

    #[error("Failed to stage build context from {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("The 'pack' CLI is not installed or not present in PATH.")]
    BuilderNotInstalled,

    #[error("pack build failed with exit code {0}.")]
    BuilderFailed(i32),

    #[error("pack build was terminated by a signal.")]
    BuilderTerminated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PushError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("The '{0}' CLI is not installed or not present in PATH.")]
    ClientNotInstalled(ContainerClient),

    #[error("{client} command failed with exit code {code}.")]
    CommandFailed { client: ContainerClient, code: i32 },

    #[error("{0} command was terminated by a signal.")]
    Terminated(ContainerClient),

    #[error("Failed to run {client}: {source}")]
    Io {
        client: ContainerClient,
        #[source]
        source: std::io::Error,
    },
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
pub type PushResult<T> = std::result::Result<T, PushError>;
