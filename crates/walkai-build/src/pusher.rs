//! レジストリへのイメージプッシュ
//!
//! `docker`/`podman` CLI を使って login → tag → push を順に実行します。
//! パスワードは標準入力経由でのみ渡し、引数やログには出しません。

use crate::error::{PushError, PushResult};
use crate::reference::{ReferencePolicy, registry_host};
use crate::runner::{CommandRunner, Invocation};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use walkai_config::RegistryConfig;

/// プッシュに使うコンテナ CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerClient {
    #[default]
    Docker,
    Podman,
}

impl ContainerClient {
    pub fn program(&self) -> &'static str {
        match self {
            ContainerClient::Docker => "docker",
            ContainerClient::Podman => "podman",
        }
    }
}

impl fmt::Display for ContainerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for ContainerClient {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(ContainerClient::Docker),
            "podman" => Ok(ContainerClient::Podman),
            _ => Err("Client must be either 'docker' or 'podman'.".to_string()),
        }
    }
}

/// レジストリの認証情報
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl From<RegistryConfig> for RegistryCredentials {
    fn from(config: RegistryConfig) -> Self {
        Self {
            url: config.url,
            username: config.username,
            password: config.password,
        }
    }
}

/// コンテナ CLI を介したレジストリ操作
pub struct RegistrySession<R> {
    runner: R,
    client: ContainerClient,
}

impl<R: CommandRunner> RegistrySession<R> {
    pub fn new(runner: R, client: ContainerClient) -> Self {
        Self { runner, client }
    }

    pub fn client(&self) -> ContainerClient {
        self.client
    }

    /// `<client> login <host> --username <user> --password-stdin`
    pub fn login(&self, host: &str, credentials: &RegistryCredentials) -> PushResult<()> {
        let invocation = Invocation::new(self.client.program())
            .args(["login", host, "--username", credentials.username.as_str()])
            .arg("--password-stdin")
            .stdin(credentials.password.as_str());
        self.run(&invocation)
    }

    pub fn tag(&self, local: &str, remote: &str) -> PushResult<()> {
        let invocation = Invocation::new(self.client.program()).args(["tag", local, remote]);
        self.run(&invocation)
    }

    pub fn push(&self, remote: &str) -> PushResult<()> {
        let invocation = Invocation::new(self.client.program()).args(["push", remote]);
        self.run(&invocation)
    }

    /// 参照を組み立て、login・tag・push を実行してリモート参照を返す
    pub fn push_image(
        &self,
        local: &str,
        credentials: &RegistryCredentials,
        policy: ReferencePolicy,
        repository: Option<&str>,
    ) -> PushResult<String> {
        let remote = policy.remote_reference(local, &credentials.url, repository)?;
        let host = registry_host(&credentials.url)?;
        debug!(%policy, %remote, %host, "Resolved remote reference");

        self.login(&host, credentials)?;
        self.tag(local, &remote)?;
        self.push(&remote)?;

        info!("Pushed {} to {}", local, remote);
        Ok(remote)
    }

    fn run(&self, invocation: &Invocation) -> PushResult<()> {
        debug!("Running: {}", invocation);

        let status = self.runner.run(invocation).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PushError::ClientNotInstalled(self.client)
            } else {
                PushError::Io {
                    client: self.client,
                    source: e,
                }
            }
        })?;

        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => Err(PushError::CommandFailed {
                client: self.client,
                code,
            }),
            None => Err(PushError::Terminated(self.client)),
        }
    }
}
