//! walkai config

use crate::{ConfigCommands, SaveArgs};
use colored::Colorize;
use walkai_config::{ApiConfig, CliConfig, ConfigStore, RegistryConfig};

pub fn handle(store: &ConfigStore, cmd: ConfigCommands) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Save(args) => save(store, args),
        ConfigCommands::Show => show(store),
        ConfigCommands::Clear => clear(store),
    }
}

fn save(store: &ConfigStore, args: SaveArgs) -> anyhow::Result<()> {
    // 同時指定は clap 側で保証済み
    let registry = match (args.url, args.username, args.password) {
        (Some(url), Some(username), Some(password)) => Some(RegistryConfig {
            url: url.trim().to_string(),
            username: username.trim().to_string(),
            password,
        }),
        _ => None,
    };
    let walkai_api = match (args.api_url, args.pat) {
        (Some(api_url), Some(pat)) => Some(ApiConfig {
            api_url: api_url.trim().to_string(),
            pat,
        }),
        _ => None,
    };

    let existing = store.load()?.unwrap_or_default();
    let merged = existing.merged_with(CliConfig {
        registry,
        walkai_api,
    });
    let saved = store.save(&merged)?;

    println!("{}", "Configuration saved.".green());
    println!("Location: {}", saved.display());
    Ok(())
}

fn show(store: &ConfigStore) -> anyhow::Result<()> {
    println!("Location: {}", store.path().display());

    let Some(config) = store.load()? else {
        println!("{}", "No configuration found.".yellow());
        return Ok(());
    };

    if let Some(registry) = &config.registry {
        println!();
        println!("{}", "[registry]".bold());
        println!("  url      = {}", registry.url.cyan());
        println!("  username = {}", registry.username);
        println!("  password = {}", mask(&registry.password).dimmed());
    }
    if let Some(api) = &config.walkai_api {
        println!();
        println!("{}", "[walkai]".bold());
        println!("  api_url  = {}", api.api_url.cyan());
        println!("  pat      = {}", mask(&api.pat).dimmed());
    }
    Ok(())
}

fn clear(store: &ConfigStore) -> anyhow::Result<()> {
    if store.clear()? {
        println!("{}", "Configuration deleted.".green());
    } else {
        println!("{}", "No configuration found to delete.".yellow());
    }
    println!("Location: {}", store.path().display());
    Ok(())
}

/// 末尾4文字だけ残して伏せる（短い値は全て伏せる）
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("********{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask("hunter2"), "********");
        assert_eq!(mask(""), "********");
        assert_eq!(mask("walkai_pat_0123456789"), "********6789");
    }
}
