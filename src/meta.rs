use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use crate::env;

/// Where a metadata field's value comes from: an environment variable or
/// a file path, typically a downward-API mount inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    EnvVar(String),
    FilePath(PathBuf),
}

/// One field-name/source pair in a [`MetaSpec`].
///
/// Several entries may share the same field name; resolution takes the
/// first source that yields a value and skips the rest.
#[derive(Debug, Clone)]
pub struct MetaField {
    pub name: String,
    pub source: FieldSource,
}

impl MetaField {
    pub fn env(name: impl Into<String>, var: impl Into<String>) -> Self {
        MetaField { name: name.into(), source: FieldSource::EnvVar(var.into()) }
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        MetaField { name: name.into(), source: FieldSource::FilePath(path.into()) }
    }
}

/// Typed list of metadata sources, fixed at startup.
///
/// This replaces runtime-interpreted configuration: the recognized fields
/// and their sources are enumerated explicitly and validated before the
/// logging pipeline is installed.
#[derive(Debug, Clone)]
pub struct MetaSpec {
    pub fields: Vec<MetaField>,
}

impl MetaSpec {
    /// The conventional Kubernetes spec: downward-API env vars for pod,
    /// namespace, node, IP and container identity, with the serviceaccount
    /// namespace file as a fallback when the namespace var is not projected.
    pub fn kube() -> Self {
        MetaSpec {
            fields: vec![
                MetaField::env("pod_name", env::POD_NAME_ENV),
                MetaField::env("namespace", env::POD_NAMESPACE_ENV),
                MetaField::file("namespace", env::NAMESPACE_FILE),
                MetaField::env("node_name", env::NODE_NAME_ENV),
                MetaField::env("pod_ip", env::POD_IP_ENV),
                MetaField::env("container_name", env::CONTAINER_NAME_ENV),
            ],
        }
    }

    /// A spec with no sources; resolution yields empty metadata.
    pub fn empty() -> Self {
        MetaSpec { fields: Vec::new() }
    }

    /// Append a custom field source.
    pub fn with_field(mut self, field: MetaField) -> Self {
        self.fields.push(field);
        self
    }

    /// Reject specs that could never produce a usable field.
    pub fn validate(&self) -> Result<(), MetaSpecError> {
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(MetaSpecError::EmptyFieldName);
            }
        }
        Ok(())
    }
}

impl Default for MetaSpec {
    fn default() -> Self {
        MetaSpec::kube()
    }
}

/// Error type returned when validating a [`MetaSpec`].
#[derive(thiserror::Error, Debug)]
pub enum MetaSpecError {
    #[error("metadata spec contains a field with an empty name")]
    EmptyFieldName,
}

/// Immutable field-name → value mapping describing the orchestration
/// environment the process runs in.
///
/// Built once at startup and shared read-only by every layer invocation.
/// Fields whose sources were absent or malformed are simply not present,
/// never present as empty strings, so downstream consumers can tell
/// "unknown" from "empty".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KubeMetadata {
    fields: BTreeMap<String, String>,
}

impl KubeMetadata {
    /// Build metadata directly from name/value pairs, bypassing source
    /// resolution. Mostly useful in tests and demos.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        KubeMetadata {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Resolves a [`MetaSpec`] at most once per process.
///
/// The first call to [`resolve`](CachedResolver::resolve) reads the
/// configured sources and caches the result; every later call returns the
/// identical cached value without touching the environment or filesystem
/// again. Values are assumed stable for the process lifetime, which holds
/// for orchestration metadata fixed at pod scheduling time. Concurrent
/// first calls are serialized by the `OnceLock`, so only one resolution
/// ever runs.
pub struct CachedResolver {
    spec: MetaSpec,
    resolved: OnceLock<KubeMetadata>,
    source_reads: AtomicU64,
}

impl CachedResolver {
    pub fn new(spec: MetaSpec) -> Self {
        CachedResolver {
            spec,
            resolved: OnceLock::new(),
            source_reads: AtomicU64::new(0),
        }
    }

    /// Resolve the spec, or return the already-cached metadata.
    ///
    /// Never fails: sources that are unset, unreadable or empty after
    /// trimming just leave their field out of the result.
    pub fn resolve(&self) -> &KubeMetadata {
        self.resolved.get_or_init(|| {
            let mut fields = BTreeMap::new();
            for field in &self.spec.fields {
                if fields.contains_key(&field.name) {
                    continue;
                }
                self.source_reads.fetch_add(1, Ordering::Relaxed);
                if let Some(value) = read_source(&field.source) {
                    fields.insert(field.name.clone(), value);
                }
            }
            KubeMetadata { fields }
        })
    }

    /// Number of source probes performed so far. Stops increasing after
    /// the first `resolve` call completes.
    pub fn source_reads(&self) -> u64 {
        self.source_reads.load(Ordering::Relaxed)
    }
}

/// Read and trim one source. `None` covers every failure mode: variable
/// unset or non-unicode, file missing or unreadable, value empty after
/// trimming.
fn read_source(source: &FieldSource) -> Option<String> {
    let raw = match source {
        FieldSource::EnvVar(var) => std::env::var(var).ok()?,
        FieldSource::FilePath(path) => std::fs::read_to_string(path).ok()?,
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn resolves_present_env_var_and_omits_missing() {
        std::env::set_var("TKM_TEST_POD_NAME", "demo-7f8");
        let spec = MetaSpec::empty()
            .with_field(MetaField::env("pod_name", "TKM_TEST_POD_NAME"))
            .with_field(MetaField::env("namespace", "TKM_TEST_UNSET_NAMESPACE"));

        let resolver = CachedResolver::new(spec);
        let meta = resolver.resolve();

        assert_eq!(meta.get("pod_name"), Some("demo-7f8"));
        assert!(!meta.contains("namespace"));
        assert_eq!(meta.len(), 1);
    }

    #[test]
    fn resolves_file_source_and_trims() {
        let path = temp_file("tkm_test_namespace", "  kube-system\n");
        let spec = MetaSpec::empty().with_field(MetaField::file("namespace", &path));

        let meta = CachedResolver::new(spec).resolve().clone();
        assert_eq!(meta.get("namespace"), Some("kube-system"));
    }

    #[test]
    fn missing_file_and_blank_value_are_omitted() {
        let blank = temp_file("tkm_test_blank", "   \n");
        let spec = MetaSpec::empty()
            .with_field(MetaField::file("node_name", "/nonexistent/tkm/node"))
            .with_field(MetaField::file("pod_ip", &blank));

        let meta = CachedResolver::new(spec).resolve().clone();
        assert!(meta.is_empty());
    }

    #[test]
    fn first_source_wins_per_field() {
        std::env::set_var("TKM_TEST_NS_VAR", "from-env");
        let path = temp_file("tkm_test_ns_file", "from-file");
        let spec = MetaSpec::empty()
            .with_field(MetaField::env("namespace", "TKM_TEST_NS_VAR"))
            .with_field(MetaField::file("namespace", &path));

        let meta = CachedResolver::new(spec).resolve().clone();
        assert_eq!(meta.get("namespace"), Some("from-env"));
    }

    #[test]
    fn fallback_source_used_when_first_fails() {
        let path = temp_file("tkm_test_ns_fallback", "from-file");
        let spec = MetaSpec::empty()
            .with_field(MetaField::env("namespace", "TKM_TEST_UNSET_NS"))
            .with_field(MetaField::file("namespace", &path));

        let meta = CachedResolver::new(spec).resolve().clone();
        assert_eq!(meta.get("namespace"), Some("from-file"));
    }

    #[test]
    fn second_resolve_returns_cache_without_rereading() {
        std::env::set_var("TKM_TEST_CACHED", "first");
        let spec = MetaSpec::empty().with_field(MetaField::env("pod_name", "TKM_TEST_CACHED"));
        let resolver = CachedResolver::new(spec);

        let first = resolver.resolve().clone();
        let reads_after_first = resolver.source_reads();

        // A changed source must not be observed by a later call.
        std::env::set_var("TKM_TEST_CACHED", "second");
        let second = resolver.resolve().clone();

        assert_eq!(first, second);
        assert_eq!(first.get("pod_name"), Some("first"));
        assert_eq!(resolver.source_reads(), reads_after_first);
    }

    #[test]
    fn validate_rejects_empty_field_name() {
        let spec = MetaSpec::empty().with_field(MetaField::env("  ", "WHATEVER"));
        assert!(matches!(spec.validate(), Err(MetaSpecError::EmptyFieldName)));
    }

    #[test]
    fn kube_spec_validates() {
        assert!(MetaSpec::kube().validate().is_ok());
    }
}
