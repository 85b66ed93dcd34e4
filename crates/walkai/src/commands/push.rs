//! walkai push

use anyhow::anyhow;
use colored::Colorize;
use walkai_build::{
    ContainerClient, ReferencePolicy, RegistryCredentials, RegistrySession, SystemRunner,
};
use walkai_config::ConfigStore;

/// 認証情報の取得元に応じた既定ポリシーとともに返す
///
/// 保存済みの `[registry]` を優先し、無ければ WalkAI API から発行してもらう。
async fn resolve_credentials(
    store: &ConfigStore,
) -> anyhow::Result<(RegistryCredentials, ReferencePolicy)> {
    let config = super::load_config(store)?;

    if let Some(registry) = config.registry {
        tracing::debug!("Using stored registry credentials for {}", registry.url);
        return Ok((registry.into(), ReferencePolicy::ComposePath));
    }

    if config.walkai_api.is_some() {
        let client = super::api_client(store)?;
        let issued = client.registry_credentials().await?;
        return Ok((issued.into(), ReferencePolicy::InjectTag));
    }

    Err(anyhow!(
        "No registry configuration found. Run 'walkai config save' first."
    ))
}

pub async fn handle(
    store: &ConfigStore,
    image: &str,
    repository: Option<&str>,
    client: ContainerClient,
    policy: Option<ReferencePolicy>,
) -> anyhow::Result<()> {
    let (credentials, default_policy) = resolve_credentials(store).await?;
    let policy = policy.unwrap_or(default_policy);

    let session = RegistrySession::new(SystemRunner, client);
    let remote = session.push_image(image, &credentials, policy, repository)?;

    println!("{}", format!("Image pushed to {}", remote).green());
    Ok(())
}
