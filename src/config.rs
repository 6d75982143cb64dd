use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The credential shape is picked once at startup and threaded into the
/// client. Personal API keys go into `Authorization` verbatim; OAuth
/// access tokens are sent as a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    Bearer(String),
}

impl Credential {
    pub fn from_token(token: String) -> Self {
        if token.starts_with("lin_api_") {
            Credential::ApiKey(token)
        } else {
            Credential::Bearer(token)
        }
    }

    pub fn header_value(&self) -> String {
        match self {
            Credential::ApiKey(key) => key.clone(),
            Credential::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub api_key: Option<String>,
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".linear-hook")
        .join("config.toml")
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: FileConfig =
        toml::from_str(&contents).with_context(|| "Failed to parse config.toml")?;
    Ok(config)
}

/// Resolve the credential: `--token` flag, then `LINEAR_API_KEY`, then
/// `~/.linear-hook/config.toml`.
pub fn resolve_credential(flag_token: Option<String>) -> Result<Credential> {
    if let Some(token) = flag_token {
        return Ok(Credential::from_token(token));
    }
    if let Ok(token) = std::env::var("LINEAR_API_KEY") {
        if !token.is_empty() {
            return Ok(Credential::from_token(token));
        }
    }
    if let Some(token) = load_file_config(&config_path())?.api_key {
        return Ok(Credential::from_token(token));
    }
    bail!(
        "No Linear credential. Pass --token, set LINEAR_API_KEY, or add api_key to {}",
        config_path().display()
    );
}
