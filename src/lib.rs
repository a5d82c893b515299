//! Kubernetes-aware JSON logging for `tracing`.
//!
//! Resolves pod/node metadata from downward-API env vars and files once
//! at startup, stamps it onto every log record in the process, and emits
//! one JSON object per line for an EFK/ELK collector. Running outside a
//! cluster degrades silently to plain structured records.

pub mod env;
pub mod meta;
pub mod record;
pub mod format;
pub mod inject;
pub mod sink;
pub mod layer;
pub mod console;
pub mod noop_sink;
pub mod backend;
pub mod init;
