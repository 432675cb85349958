use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "dunktank.toml";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Configuration stored in dunktank.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DunkTankConfig {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub dunk: DunkSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            prefix: default_prefix(),
        }
    }
}

fn default_store_url() -> String {
    "${REDIS_URL}".to_string()
}

fn default_prefix() -> String {
    "dunktank".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DunkSettings {
    #[serde(default = "default_odds")]
    pub odds: u32,
}

impl Default for DunkSettings {
    fn default() -> Self {
        Self { odds: default_odds() }
    }
}

fn default_odds() -> u32 {
    dunktank::DEFAULT_DUNK_ODDS
}

impl DunkTankConfig {
    /// Loads `explicit` if given (it must exist), else `dunktank.toml` in the
    /// working directory when present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::from_file(&fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Get the Redis URL, expanding a `${VAR}` reference from the environment.
    pub fn redis_url(&self) -> String {
        let url = self.store.url.as_str();
        if url.starts_with("${") && url.ends_with('}') {
            let var_name = &url[2..url.len() - 1];
            std::env::var(var_name).unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string())
        } else {
            url.to_string()
        }
    }
}
