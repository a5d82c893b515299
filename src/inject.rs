use serde_json::Value;

use crate::format;
use crate::meta::KubeMetadata;
use crate::record::LogRecord;

/// Merge resolved environment metadata into a record's attribute map.
///
/// Each metadata field is added only if the record does not already carry
/// an attribute with that name, so caller-set fields always win on
/// collision and base attributes can never be shadowed. Runs in
/// O(metadata fields), never fails, and never touches the shared metadata.
/// Injecting twice is safe: the second pass finds every field present and
/// skips it.
pub fn inject_into(record: &mut LogRecord, meta: &KubeMetadata) {
    for (name, value) in meta.iter() {
        if format::is_base_attr(name) || record.fields.contains_key(name) {
            continue;
        }
        record.fields.insert(name.to_string(), Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn record() -> LogRecord {
        LogRecord {
            timestamp: Utc::now(),
            pid: 1,
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
    fn injects_all_metadata_fields() {
        let meta = KubeMetadata::from_pairs([("pod_name", "demo-7f8"), ("namespace", "prod")]);
        let mut rec = record();

        inject_into(&mut rec, &meta);

        assert_eq!(rec.fields["pod_name"], Value::from("demo-7f8"));
        assert_eq!(rec.fields["namespace"], Value::from("prod"));
    }

    #[test]
    fn caller_set_field_wins_on_collision() {
        let meta = KubeMetadata::from_pairs([("namespace", "kube-ns")]);
        let mut rec = record();
        rec.fields.insert("namespace".to_string(), Value::from("custom"));

        inject_into(&mut rec, &meta);

        assert_eq!(rec.fields["namespace"], Value::from("custom"));
    }

    #[test]
    fn injection_is_idempotent() {
        let meta = KubeMetadata::from_pairs([("pod_name", "demo-7f8"), ("node_name", "n1")]);
        let mut rec = record();

        inject_into(&mut rec, &meta);
        let once = rec.fields.clone();
        inject_into(&mut rec, &meta);

        assert_eq!(rec.fields, once);
    }

    #[test]
    fn empty_metadata_is_a_no_op() {
        let mut rec = record();
        rec.fields.insert("request_id".to_string(), Value::from("abc"));
        let before = rec.fields.clone();

        inject_into(&mut rec, &KubeMetadata::default());

        assert_eq!(rec.fields, before);
    }

    #[test]
    fn base_attribute_names_are_never_shadowed() {
        let meta = KubeMetadata::from_pairs([("level", "SPOOFED"), ("pod_name", "p")]);
        let mut rec = record();

        inject_into(&mut rec, &meta);

        assert!(!rec.fields.contains_key("level"));
        assert_eq!(rec.level, "INFO");
        assert_eq!(rec.fields["pod_name"], Value::from("p"));
    }
}
