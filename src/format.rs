use serde_json::{Map, Value};

use crate::meta::KubeMetadata;
use crate::record::LogRecord;

/// Attribute names every record carries, in render order.
pub const BASE_ATTRS: &[&str] = &[
    "timestamp",
    "pid",
    "level",
    "target",
    "module_path",
    "file",
    "line",
    "message",
];

/// Whether `name` is one of the base record attributes. Injection must
/// never shadow these.
pub fn is_base_attr(name: &str) -> bool {
    BASE_ATTRS.contains(&name)
}

/// Ordered sequence of attribute names a sink renders for each record:
/// the base attributes followed by the resolved metadata keys.
///
/// Every key in the spec renders from the record or as `null`; a key the
/// record does not carry never fails rendering. Caller-supplied fields
/// not named by the spec are appended after the templated keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    keys: Vec<String>,
}

impl FormatSpec {
    /// Derive the key order from the base attributes plus the fields the
    /// resolver actually found. Unresolved fields are not part of the
    /// spec, so their keys never appear in output.
    pub fn derive(meta: &KubeMetadata) -> Self {
        let mut keys: Vec<String> = BASE_ATTRS.iter().map(|s| s.to_string()).collect();
        keys.extend(meta.keys().map(str::to_string));
        FormatSpec { keys }
    }

    /// The base attributes only; used when no metadata was resolved.
    pub fn base() -> Self {
        FormatSpec::derive(&KubeMetadata::default())
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Render one record as a single JSON object following the spec's
    /// key order.
    pub fn render(&self, record: &LogRecord) -> Value {
        let mut map = Map::with_capacity(self.keys.len() + record.fields.len());
        for key in &self.keys {
            let value = base_value(record, key)
                .or_else(|| record.fields.get(key).cloned())
                .unwrap_or(Value::Null);
            map.insert(key.clone(), value);
        }
        for (key, value) in &record.fields {
            if !map.contains_key(key) {
                map.insert(key.clone(), value.clone());
            }
        }
        Value::Object(map)
    }

    /// Render one record as a JSON line, without the trailing newline.
    pub fn render_line(&self, record: &LogRecord) -> String {
        serde_json::to_string(&self.render(record)).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for FormatSpec {
    fn default() -> Self {
        FormatSpec::base()
    }
}

fn base_value(record: &LogRecord, name: &str) -> Option<Value> {
    match name {
        "timestamp" => Some(Value::String(record.timestamp_rfc3339())),
        "pid" => Some(Value::from(record.pid)),
        "level" => Some(Value::String(record.level.clone())),
        "target" => Some(Value::String(record.target.clone())),
        "module_path" => Some(opt_str(&record.module_path)),
        "file" => Some(opt_str(&record.file)),
        "line" => Some(record.line.map(Value::from).unwrap_or(Value::Null)),
        "message" => Some(opt_str(&record.message)),
        _ => None,
    }
}

fn opt_str(value: &Option<String>) -> Value {
    value.as_ref().map(|s| Value::String(s.clone())).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn record() -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            pid: 42,
            level: "INFO".to_string(),
            target: "demo".to_string(),
            module_path: None,
            file: None,
            line: None,
            message: Some("started".to_string()),
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn spec_orders_base_attrs_before_metadata_keys() {
        let meta = KubeMetadata::from_pairs([("pod_name", "p"), ("namespace", "ns")]);
        let spec = FormatSpec::derive(&meta);

        assert_eq!(&spec.keys()[..BASE_ATTRS.len()], BASE_ATTRS);
        assert_eq!(&spec.keys()[BASE_ATTRS.len()..], &["namespace", "pod_name"]);
    }

    #[test]
    fn missing_spec_key_renders_as_null_not_error() {
        let meta = KubeMetadata::from_pairs([("pod_name", "p")]);
        let spec = FormatSpec::derive(&meta);

        // Record was never injected, so pod_name is absent from it.
        let rendered = spec.render(&record());
        assert_eq!(rendered["pod_name"], Value::Null);
        assert_eq!(rendered["message"], Value::String("started".to_string()));
    }

    #[test]
    fn caller_extras_are_appended_after_templated_keys() {
        let spec = FormatSpec::base();
        let mut rec = record();
        rec.fields.insert("request_id".to_string(), Value::from("abc-1"));

        let rendered = spec.render(&rec);
        let keys: Vec<&String> = rendered.as_object().unwrap().keys().collect();
        assert_eq!(keys.last().unwrap().as_str(), "request_id");
        assert_eq!(rendered["request_id"], Value::from("abc-1"));
    }

    #[test]
    fn render_line_is_one_json_object() {
        let line = FormatSpec::base().render_line(&record());
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["level"], "INFO");
        assert!(!line.contains('\n'));
    }
}
