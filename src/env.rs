/// Environment variable names and downward-API file paths read by the
/// default metadata spec.
///
/// These are purely conventions; [`crate::meta::MetaSpec`] accepts any
/// set of sources, so the core stays decoupled from these names.

/// Pod name, usually projected via `fieldRef: metadata.name`.
pub const POD_NAME_ENV: &str = "POD_NAME";

/// Pod namespace, usually projected via `fieldRef: metadata.namespace`.
pub const POD_NAMESPACE_ENV: &str = "POD_NAMESPACE";

/// Name of the node the pod was scheduled onto (`fieldRef: spec.nodeName`).
pub const NODE_NAME_ENV: &str = "NODE_NAME";

/// Pod IP (`fieldRef: status.podIP`).
pub const POD_IP_ENV: &str = "POD_IP";

/// Container name; the downward API has no fieldRef for this, so services
/// set it in their pod spec themselves.
pub const CONTAINER_NAME_ENV: &str = "CONTAINER_NAME";

/// Fallback source for the namespace when the env var is not projected:
/// the serviceaccount mount present in every in-cluster container.
pub const NAMESPACE_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Output stream selector consumed by
/// [`crate::init::init_kube_json_from_env`]: `stdout`, `stderr` or `noop`.
pub const LOG_TARGET_ENV: &str = "LOG_TARGET";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
