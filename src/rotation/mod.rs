//! Key rotation: validate an identifier, mint a fresh secret, persist it as a new
//! store version and hand the value back to the caller.

pub mod error;
pub mod generator;

use std::fmt;
use std::sync::Arc;

use crate::diagnostics::{DiagnosticEntry, DiagnosticsSink, Severity};
use crate::store::SecretStore;

pub use error::{Result, RotationError};
pub use generator::{Alphabet, RandomTokenGenerator, SecretGenerator};

/// Validated name of a credential.
///
/// Kept verbatim; only null, empty and whitespace-only values are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyId(String);

impl KeyId {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw {
            None => Err(RotationError::InvalidArgument(
                "key id must not be null".to_string(),
            )),
            Some(s) if s.is_empty() => Err(RotationError::InvalidArgument(
                "key id must not be empty".to_string(),
            )),
            Some(s) if s.trim().is_empty() => Err(RotationError::InvalidArgument(
                "key id must not be whitespace".to_string(),
            )),
            Some(s) => Ok(KeyId(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a successful rotation. `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct RotationResult {
    id: String,
    key: String,
}

impl RotationResult {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn into_parts(self) -> (String, String) {
        (self.id, self.key)
    }
}

impl fmt::Debug for RotationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotationResult")
            .field("id", &self.id)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Rotates API keys against a versioned secret store.
///
/// Holds no state between calls. Overlapping rotations of the same key are not
/// serialized here; the store decides which version is latest.
#[derive(Clone)]
pub struct KeyRotationService {
    store: Arc<dyn SecretStore>,
    sink: Arc<dyn DiagnosticsSink>,
    generator: Arc<dyn SecretGenerator>,
    path_prefix: String,
}

impl KeyRotationService {
    pub fn new(store: Arc<dyn SecretStore>, sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            store,
            sink,
            generator: Arc::new(RandomTokenGenerator::default()),
            path_prefix: String::new(),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn SecretGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    /// Store path for a key: `{prefix}/{key_id}`, or the bare id without a prefix.
    pub fn path_for(&self, key_id: &KeyId) -> String {
        if self.path_prefix.is_empty() {
            key_id.as_str().to_string()
        } else {
            format!("{}/{}", self.path_prefix, key_id)
        }
    }

    /// Rotate a single key. Resolves once the store has acknowledged or refused the write.
    pub async fn rotate_key<'a>(
        &self,
        key_id: impl Into<Option<&'a str>>,
    ) -> Result<RotationResult> {
        let key_id = match KeyId::parse(key_id.into()) {
            Ok(id) => id,
            Err(e) => {
                self.sink.record(
                    DiagnosticEntry::new(Severity::Warn, "rotation.invalid_argument")
                        .with("error", &e),
                );
                return Err(e);
            }
        };

        let path = self.path_for(&key_id);

        let new_key = match self.generator.generate() {
            Ok(k) if !k.is_empty() => k,
            Ok(_) => {
                return Err(self.generation_failed(&key_id, "generator returned an empty value"))
            }
            Err(e) => return Err(self.generation_failed(&key_id, &format!("{:#}", e))),
        };

        match self.store.write(&path, &new_key).await {
            Ok(receipt) => {
                let mut entry = DiagnosticEntry::new(Severity::Info, "rotation.succeeded")
                    .with("key_id", &key_id)
                    .with("path", &receipt.path);
                if let Some(version) = receipt.version {
                    entry = entry.with("version", version);
                }
                self.sink.record(entry);

                Ok(RotationResult {
                    id: key_id.0,
                    key: new_key,
                })
            }
            Err(source) => {
                self.sink.record(
                    DiagnosticEntry::new(Severity::Error, "rotation.store_write_failed")
                        .with("key_id", &key_id)
                        .with("path", &path)
                        .with("error", &source),
                );
                Err(RotationError::StoreWriteFailed {
                    key_id: key_id.0,
                    source,
                })
            }
        }
    }

    fn generation_failed(&self, key_id: &KeyId, reason: &str) -> RotationError {
        self.sink.record(
            DiagnosticEntry::new(Severity::Error, "rotation.generation_failed")
                .with("key_id", key_id)
                .with("error", reason),
        );
        RotationError::Generation(reason.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::store::MemorySecretStore;

    struct BrokenGenerator;

    impl SecretGenerator for BrokenGenerator {
        fn generate(&self) -> anyhow::Result<String> {
            anyhow::bail!("entropy source unavailable")
        }
    }

    struct EmptyGenerator;

    impl SecretGenerator for EmptyGenerator {
        fn generate(&self) -> anyhow::Result<String> {
            Ok(String::new())
        }
    }

    fn service() -> (KeyRotationService, MemorySecretStore, MemorySink) {
        let store = MemorySecretStore::new();
        let sink = MemorySink::new();
        let svc = KeyRotationService::new(Arc::new(store.clone()), Arc::new(sink.clone()));
        (svc, store, sink)
    }

    #[test]
    fn test_key_id_parse() {
        assert!(KeyId::parse(Some("svc")).is_ok());
        assert_eq!(KeyId::parse(Some(" padded ")).unwrap().as_str(), " padded ");
        for bad in [None, Some(""), Some("   "), Some("\t\n")] {
            assert!(matches!(
                KeyId::parse(bad),
                Err(RotationError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_path_for_prefix() {
        let (svc, _, _) = service();
        let id = KeyId::parse(Some("billing")).unwrap();
        assert_eq!(svc.path_for(&id), "billing");

        let svc = svc.with_path_prefix("apikeys/");
        assert_eq!(svc.path_for(&id), "apikeys/billing");
    }

    #[test]
    fn test_rotation_result_debug_redacts_key() {
        let result = RotationResult {
            id: "svc".to_string(),
            key: "super-secret".to_string(),
        };
        let rendered = format!("{:?}", result);
        assert!(rendered.contains("svc"));
        assert!(!rendered.contains("super-secret"));
    }

    #[tokio::test]
    async fn test_rotate_writes_new_version() {
        let (svc, store, sink) = service();
        let svc = svc.with_path_prefix("apikeys");

        let result = svc.rotate_key("test-key").await.unwrap();
        assert_eq!(result.id(), "test-key");
        assert!(!result.key().is_empty());
        assert_eq!(
            store.latest("apikeys/test-key").await.as_deref(),
            Some(result.key())
        );

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Info);
        assert_eq!(entries[0].attribute("version"), Some("1"));
        assert_eq!(entries[0].attribute("path"), Some("apikeys/test-key"));
    }

    #[tokio::test]
    async fn test_invalid_id_logs_once_and_skips_store() {
        let (svc, store, sink) = service();

        let err = svc.rotate_key(None::<&str>).await.unwrap_err();
        assert!(matches!(err, RotationError::InvalidArgument(_)));
        assert_eq!(err.kind(), "invalid_argument");
        assert_eq!(store.write_count().await, 0);

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Warn);
        assert_eq!(entries[0].message, "rotation.invalid_argument");
    }

    #[tokio::test]
    async fn test_generator_failure_skips_store() {
        let (svc, store, sink) = service();
        let svc = svc.with_generator(Arc::new(BrokenGenerator));

        let err = svc.rotate_key("svc").await.unwrap_err();
        match err {
            RotationError::Generation(msg) => assert!(msg.contains("entropy")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.write_count().await, 0);
        assert_eq!(sink.entries()[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_empty_generated_value_is_rejected() {
        let (svc, store, _) = service();
        let svc = svc.with_generator(Arc::new(EmptyGenerator));

        let err = svc.rotate_key("svc").await.unwrap_err();
        assert!(matches!(err, RotationError::Generation(_)));
        assert_eq!(store.write_count().await, 0);
    }

    #[tokio::test]
    async fn test_store_failure_wraps_cause() {
        let (svc, store, sink) = service();
        store.set_failing(true);

        let err = svc.rotate_key("svc-prod").await.unwrap_err();
        match &err {
            RotationError::StoreWriteFailed { key_id, source } => {
                assert_eq!(key_id, "svc-prod");
                assert!(source.to_string().contains("failing mode"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(std::error::Error::source(&err).is_some());

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "rotation.store_write_failed");
        assert_eq!(entries[0].attribute("key_id"), Some("svc-prod"));
        assert!(entries[0].attribute("error").is_some());
    }

    #[tokio::test]
    async fn test_concurrent_rotations_each_create_a_version() {
        let (svc, store, _) = service();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.rotate_key("shared").await })
            })
            .collect();

        let mut keys = Vec::new();
        for h in handles {
            keys.push(h.await.unwrap().unwrap().key().to_string());
        }
        keys.sort();
        keys.dedup();

        assert_eq!(keys.len(), 8);
        assert_eq!(store.versions("shared").await.len(), 8);
    }
}
