pub mod build;
pub mod config;
pub mod inputs;
pub mod push;
pub mod secrets;
pub mod submit;

use anyhow::anyhow;
use std::path::PathBuf;
use walkai_api::WalkaiClient;
use walkai_config::{CliConfig, ConfigStore};

/// `--config` / `WALKAI_CONFIG` があればそれを、なければ既定の場所を使う
pub fn config_store(path: Option<PathBuf>) -> anyhow::Result<ConfigStore> {
    match path {
        Some(path) => Ok(ConfigStore::new(path)),
        None => Ok(ConfigStore::default_location()?),
    }
}

pub fn load_config(store: &ConfigStore) -> anyhow::Result<CliConfig> {
    Ok(store.load()?.unwrap_or_default())
}

/// `[walkai]` セクションから API クライアントを作成
pub fn api_client(store: &ConfigStore) -> anyhow::Result<WalkaiClient> {
    let api = load_config(store)?.walkai_api.ok_or_else(|| {
        anyhow!(
            "No WalkAI API configuration found. Run 'walkai config save --api-url <URL> --pat <TOKEN>' first."
        )
    })?;
    Ok(WalkaiClient::new(&api)?)
}

/// `KEY=VALUE` 形式の引数をパース
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("MODE=prod").unwrap(),
            ("MODE".to_string(), "prod".to_string())
        );
        assert_eq!(
            parse_key_val("URL=a=b").unwrap(),
            ("URL".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_key_val("EMPTY=").unwrap(),
            ("EMPTY".to_string(), String::new())
        );
        assert!(parse_key_val("NOVALUE").is_err());
        assert!(parse_key_val("=value").is_err());
    }
}
