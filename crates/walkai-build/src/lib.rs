//! WalkAI container image build and push
//!
//! This crate turns a Python project into an OCI image with Cloud Native
//! Buildpacks (`pack`) and publishes it to a registry through the
//! `docker`/`podman` CLI. External processes are spawned through the
//! [`CommandRunner`] trait so every step can be exercised without them.

pub mod builder;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod pusher;
pub mod reference;
pub mod runner;

pub use builder::{BuildOptions, DEFAULT_BUILDER, ImageBuilder};
pub use context::BuildContext;
pub use descriptor::{BuildDescriptor, PackageInstall};
pub use error::{BuildError, BuildResult, PushError, PushResult};
pub use pusher::{ContainerClient, RegistryCredentials, RegistrySession};
pub use reference::{ReferenceError, ReferencePolicy, normalize_registry_url, registry_host};
pub use runner::{CommandRunner, CommandStatus, Invocation, SystemRunner};
