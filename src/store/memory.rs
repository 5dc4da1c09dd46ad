use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{SecretStore, StoreError, WriteReceipt};

/// In-process versioned secret store.
///
/// Keeps every value written per path, oldest first. Versions are 1-based like Vault KV v2.
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    secrets: Arc<RwLock<HashMap<String, Vec<String>>>>,
    failing: Arc<AtomicBool>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail with `StoreError::Unavailable` until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All stored versions at `path`, oldest first.
    pub async fn versions(&self, path: &str) -> Vec<String> {
        self.secrets
            .read()
            .await
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    /// Latest value at `path`.
    pub async fn latest(&self, path: &str) -> Option<String> {
        self.secrets
            .read()
            .await
            .get(path)
            .and_then(|v| v.last().cloned())
    }

    /// Total number of writes accepted across all paths.
    pub async fn write_count(&self) -> usize {
        self.secrets.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn write(&self, path: &str, value: &str) -> Result<WriteReceipt, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store is in failing mode".to_string(),
            ));
        }

        let mut secrets = self.secrets.write().await;
        let versions = secrets.entry(path.to_string()).or_default();
        versions.push(value.to_string());
        let version = versions.len() as u64;
        drop(secrets);

        debug!(path, version, "secret version stored in memory");
        Ok(WriteReceipt {
            path: path.to_string(),
            version: Some(version),
        })
    }
}
