use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{SecretStore, StoreError, WriteReceipt};
use crate::config::VaultSettings;

// Upper bound on how much of a Vault error body is kept in errors and diagnostics
const MAX_ERROR_BODY: usize = 512;

/// Vault KV v2 write response envelope.
#[derive(Debug, Deserialize)]
struct VaultWriteResponse {
    #[serde(default)]
    data: Option<VaultWriteMetadata>,
}

#[derive(Debug, Deserialize)]
struct VaultWriteMetadata {
    version: Option<u64>,
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...(truncated)");
    }
    body
}

/// Secret store backed by a Vault KV v2 engine.
#[derive(Debug, Clone)]
pub struct VaultKvStore {
    base_url: Url,
    token: String,
    mount: String,
    secret_field: String,
    http_client: reqwest::Client,
}

impl VaultKvStore {
    pub fn new(settings: &VaultSettings, address: &str, token: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("creating HTTP client")?;

        let base_url = Url::parse(address).context("parsing Vault address")?;
        if base_url.cannot_be_a_base() {
            bail!("Vault address {} cannot carry a path", address);
        }

        let mount = settings.mount.trim_matches('/').to_string();
        if mount.is_empty() {
            bail!("Vault KV mount must not be empty");
        }

        debug!("Vault KV store initialized with base_url={}", base_url);

        Ok(VaultKvStore {
            base_url,
            token: token.to_string(),
            mount,
            secret_field: settings.secret_field.clone(),
            http_client,
        })
    }

    /// Create a store from settings plus environment variables.
    ///
    /// Environment variables:
    /// - `VAULT_ADDRESS`: Base URL (e.g., http://127.0.0.1:8200), overrides `settings.address`
    /// - `VAULT_TOKEN`: Authentication token
    /// - `VAULT_KV_MOUNT`: KV v2 mount, overrides `settings.mount`
    ///
    /// Returns `Ok(None)` when no address or token is available.
    pub fn from_settings_and_env(settings: &VaultSettings) -> Result<Option<Self>> {
        let address = std::env::var("VAULT_ADDRESS")
            .ok()
            .or_else(|| settings.address.clone());
        let token = std::env::var("VAULT_TOKEN").ok();

        let mut settings = settings.clone();
        if let Ok(mount) = std::env::var("VAULT_KV_MOUNT") {
            settings.mount = mount;
        }

        match (address, token) {
            (Some(addr), Some(tok)) => Ok(Some(Self::new(&settings, &addr, &tok)?)),
            _ => {
                debug!("Vault not configured (missing VAULT_ADDRESS or VAULT_TOKEN)");
                Ok(None)
            }
        }
    }

    pub fn from_env() -> Result<Option<Self>> {
        Self::from_settings_and_env(&VaultSettings::default())
    }

    /// Build the write URL for a secret path.
    ///
    /// Path template: {base_url}/v1/{mount}/data/{path}. Every segment is percent-encoded,
    /// so `#`, `?` and `%` stay part of the secret name. Empty, `.` and `..` segments are
    /// refused since Vault would resolve them to a different secret.
    fn data_url(&self, path: &str) -> Result<Url, StoreError> {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(StoreError::InvalidPath(format!(
                "path '{}' contains segment '{}'",
                path, bad
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidPath(format!("base url {}", self.base_url)))?
            .pop_if_empty()
            .push("v1")
            .extend(self.mount.split('/'))
            .push("data")
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl SecretStore for VaultKvStore {
    async fn write(&self, path: &str, value: &str) -> Result<WriteReceipt, StoreError> {
        let url = self.data_url(path)?;

        debug!("Writing secret version to Vault: {}", url);

        let mut data = serde_json::Map::new();
        data.insert(
            self.secret_field.clone(),
            serde_json::Value::String(value.to_string()),
        );
        let payload = serde_json::json!({ "data": data });

        let response = self
            .http_client
            .post(url)
            .header("X-Vault-Token", &self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        // 204 or an unexpected body still means the version was written
        let body = response.text().await.unwrap_or_default();
        let version = serde_json::from_str::<VaultWriteResponse>(&body)
            .ok()
            .and_then(|r| r.data)
            .and_then(|m| m.version);

        info!(path, version, "Secret version stored in Vault");
        Ok(WriteReceipt {
            path: path.to_string(),
            version,
        })
    }
}
