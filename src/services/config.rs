use crate::domain::models::Gender;
use crate::domain::constants::{DEFAULT_API_URL, DEFAULT_TIMEOUT_MS};
use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub client: ClientSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    pub api_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub default_gender: Option<Gender>,
}

/// Effective settings after layering flag/env, config file and built-in defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub default_gender: Gender,
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")?;
    Ok(PathBuf::from(home).join(".config/faceai/config.toml"))
}

pub fn parse_config(raw: &str) -> anyhow::Result<ConfigFile> {
    Ok(toml::from_str(raw)?)
}

pub fn load_config_file() -> anyhow::Result<ConfigFile> {
    let path = match config_path() {
        Ok(p) => p,
        Err(_) => return Ok(ConfigFile::default()),
    };
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    parse_config(&raw).with_context(|| format!("invalid config {}", path.display()))
}

pub fn resolve(file: ConfigFile, api_url_override: Option<&str>) -> anyhow::Result<ClientConfig> {
    let api_url = api_url_override
        .map(str::to_string)
        .or(file.client.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
        anyhow::bail!("api url must start with http:// or https://: {}", api_url);
    }
    let timeout_ms = file.client.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
    if timeout_ms == 0 {
        anyhow::bail!("timeout_ms must be greater than zero");
    }
    let config = ClientConfig {
        api_url,
        timeout: Duration::from_millis(timeout_ms),
        default_gender: file.client.default_gender.unwrap_or_default(),
    };
    tracing::debug!(api_url = %config.api_url, timeout_ms, "resolved client config");
    Ok(config)
}

pub fn load_config(api_url_override: Option<&str>) -> anyhow::Result<ClientConfig> {
    resolve(load_config_file()?, api_url_override)
}
