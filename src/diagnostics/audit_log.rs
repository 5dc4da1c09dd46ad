use tracing::{debug, error, info, warn};

use super::{DiagnosticEntry, DiagnosticsSink, Severity};

/// Forwards diagnostics to `tracing` under the `audit` target.
#[derive(Debug, Clone, Default)]
pub struct AuditSink;

impl AuditSink {
    pub fn new() -> Self {
        Self
    }
}

fn render_attributes(entry: &DiagnosticEntry) -> String {
    entry
        .attributes
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

impl DiagnosticsSink for AuditSink {
    fn record(&self, entry: DiagnosticEntry) {
        let event = entry.message.as_str();
        let key_id = entry.attribute("key_id").unwrap_or("");
        let attributes = render_attributes(&entry);
        match entry.severity {
            Severity::Debug => debug!(target: "audit", event, key_id, %attributes),
            Severity::Info => info!(target: "audit", event, key_id, %attributes),
            Severity::Warn => warn!(target: "audit", event, key_id, %attributes),
            Severity::Error => error!(target: "audit", event, key_id, %attributes),
        }
    }
}
