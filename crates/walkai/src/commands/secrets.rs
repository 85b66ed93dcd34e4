//! walkai secrets

use crate::SecretsCommands;
use colored::Colorize;
use std::collections::BTreeMap;
use walkai_api::parse_env_file;
use walkai_config::ConfigStore;

pub async fn handle(store: &ConfigStore, cmd: SecretsCommands) -> anyhow::Result<()> {
    let client = super::api_client(store)?;

    match cmd {
        SecretsCommands::List => {
            let secrets = client.list_secrets().await?;
            if secrets.is_empty() {
                println!("{}", "No secrets found.".yellow());
            }
            for secret in secrets {
                println!("{}", secret.name);
            }
        }
        SecretsCommands::Get { name } => {
            let secret = client.get_secret(&name).await?;
            println!("{} {}", "Secret:".bold(), secret.name.cyan());
            if secret.keys.is_empty() {
                println!("  {}", "(no keys)".dimmed());
            }
            for key in &secret.keys {
                println!("  - {}", key);
            }
        }
        SecretsCommands::Create {
            name,
            data,
            env_file,
        } => {
            // env ファイル → --data の順に適用（後勝ち）
            let mut values = match &env_file {
                Some(path) => parse_env_file(path)?,
                None => BTreeMap::new(),
            };
            values.extend(data);

            client.create_secret(&name, &values).await?;
            println!(
                "{}",
                format!("Secret '{}' saved with {} key(s).", name, values.len()).green()
            );
        }
        SecretsCommands::Delete { name } => {
            client.delete_secret(&name).await?;
            println!("{}", format!("Secret '{}' deleted.", name).green());
        }
    }

    Ok(())
}
