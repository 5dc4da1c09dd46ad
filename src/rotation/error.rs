use thiserror::Error;

use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, RotationError>;

#[derive(Debug, Error)]
pub enum RotationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to write new version of key '{key_id}': {source}")]
    StoreWriteFailed {
        key_id: String,
        #[source]
        source: StoreError,
    },

    #[error("secret generation failed: {0}")]
    Generation(String),
}

impl RotationError {
    /// Short stable name for diagnostics and exit reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            RotationError::InvalidArgument(_) => "invalid_argument",
            RotationError::StoreWriteFailed { .. } => "store_write_failed",
            RotationError::Generation(_) => "generation_failed",
        }
    }
}
