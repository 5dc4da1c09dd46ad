pub mod config;
pub mod diagnostics;
pub mod rotation;
pub mod store;
pub mod utils;

pub use rotation::{KeyId, KeyRotationService, RotationError, RotationResult};

// Crate version exposed for runtime queries
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
