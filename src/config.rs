use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::rotation::generator::Alphabet;

fn default_mount() -> String {
    "secret".to_string()
}

fn default_secret_field() -> String {
    "apiKey".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_key_length() -> usize {
    32
}

/// Vault connection settings. The token is never read from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultSettings {
    pub address: Option<String>,
    #[serde(default = "default_mount")]
    pub mount: String,
    /// Field name the secret value is stored under inside the KV payload
    #[serde(default = "default_secret_field")]
    pub secret_field: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            address: None,
            mount: default_mount(),
            secret_field: default_secret_field(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorSettings {
    #[serde(default = "default_key_length")]
    pub length: usize,
    #[serde(default)]
    pub alphabet: Alphabet,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            length: default_key_length(),
            alphabet: Alphabet::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Prepended to every key identifier to form the store path
    #[serde(default)]
    pub path_prefix: String,
    #[serde(default)]
    pub vault: VaultSettings,
    #[serde(default)]
    pub generator: GeneratorSettings,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path).context("reading config file")?;
        let cfg: Config = serde_json::from_str(&raw).context("parsing JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.generator.length == 0 {
            bail!("generator.length must be greater than zero");
        }
        if self.vault.timeout_secs == 0 {
            bail!("vault.timeout_secs must be greater than zero");
        }
        if self.vault.secret_field.trim().is_empty() {
            bail!("vault.secret_field must not be empty");
        }
        Ok(())
    }
}
