use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One normalized log emission, produced by the layer for every observed
/// event and consumed by a sink.
///
/// Base attributes live as struct fields; caller-supplied event fields and
/// injected environment metadata share the `fields` map. A record is
/// created per event, stamped with metadata exactly once, then discarded
/// after rendering.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    /// Process id of the emitting process.
    pub pid: u32,
    pub level: String,
    /// Logger name, i.e. the `tracing` target.
    pub target: String,
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub message: Option<String>,
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogRecord {
    /// Timestamp rendered as RFC 3339 with millisecond precision, UTC.
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}
