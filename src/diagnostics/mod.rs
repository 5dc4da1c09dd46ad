pub mod audit_log;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub use audit_log::AuditSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured log record handed to a [`DiagnosticsSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEntry {
    pub severity: Severity,
    pub message: String,
    pub attributes: BTreeMap<String, String>,
}

impl DiagnosticEntry {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl ToString) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, entry: DiagnosticEntry);
}

/// Sink that keeps entries in memory, for inspection in tests and embedding hosts.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<DiagnosticEntry>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        match self.entries.lock() {
            Ok(g) => g.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&self, entry: DiagnosticEntry) {
        match self.entries.lock() {
            Ok(mut g) => g.push(entry),
            Err(e) => e.into_inner().push(entry),
        }
    }
}
