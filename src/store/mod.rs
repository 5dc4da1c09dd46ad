pub mod memory;
pub mod vault_client;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemorySecretStore;
pub use vault_client::VaultKvStore;

/// Faults reported by a secret store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("store rejected write with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid secret path: {0}")]
    InvalidPath(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Acknowledgement of a completed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub path: String,
    /// Version assigned by the store, when it reports one.
    pub version: Option<u64>,
}

/// Write capability over a versioned secret store.
///
/// Every successful `write` creates a new version at `path`; prior versions are left
/// to the store's retention policy.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn write(&self, path: &str, value: &str) -> Result<WriteReceipt, StoreError>;
}
