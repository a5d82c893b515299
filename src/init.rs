use crate::backend::{make_sink, TargetError};
use crate::console::ConsoleSink;
use crate::env;
use crate::format::FormatSpec;
use crate::layer::KubeMetaLayer;
use crate::meta::{CachedResolver, KubeMetadata, MetaSpec, MetaSpecError};
use crate::sink::LogSink;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Buffering and filtering options for [`KubeMetaLayer`].
///
/// This is explicit, validated configuration: the recognized knobs are
/// enumerated here and checked by [`validate`](LayerConfig::validate)
/// before the pipeline is installed.
///
/// **Fields**
/// - `channel_buffer`: maximum queued [`crate::record::LogRecord`]s
///   before new ones are dropped.
/// - `batch_size`: records per sink batch.
/// - `flush_interval`: maximum time between flushes even with a partial
///   batch.
/// - `min_level`: most verbose level the layer captures; defaults to
///   `TRACE` so every record in the process gets stamped, and narrowing
///   is left to the host subscriber's own filtering.
/// - `enable_console_echo`: if `true`, a `tracing_subscriber::fmt` layer
///   is stacked on top for human-readable output alongside the JSON
///   lines. Off by default since it would interleave with JSON on
///   stdout.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub min_level: Level,
    pub enable_console_echo: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            min_level: Level::TRACE,
            enable_console_echo: false,
        }
    }
}

impl LayerConfig {
    pub fn validate(&self) -> Result<(), InitError> {
        if self.channel_buffer == 0 {
            return Err(InitError::ZeroChannelBuffer);
        }
        if self.batch_size == 0 {
            return Err(InitError::ZeroBatchSize);
        }
        Ok(())
    }
}

/// Error type returned when setting up the logging pipeline.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("channel_buffer must be non-zero")]
    ZeroChannelBuffer,

    #[error("batch_size must be non-zero")]
    ZeroBatchSize,

    #[error(transparent)]
    MetaSpec(#[from] MetaSpecError),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("failed to install global subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install the global `tracing` subscriber with a [`KubeMetaLayer`]
/// stamping the given metadata onto every event bound for `sink`.
///
/// Metadata is taken here already resolved, before any concurrent
/// logging can begin, so the injection hot path never takes a lock.
pub fn init_tracing_with_config(
    sink: Arc<dyn LogSink>,
    meta: Arc<KubeMetadata>,
    config: LayerConfig,
) -> Result<(), InitError> {
    config.validate()?;

    let (layer, _handle) = KubeMetaLayer::new(
        sink,
        meta,
        config.min_level,
        config.channel_buffer,
        config.batch_size,
        config.flush_interval,
    );

    if config.enable_console_echo {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Install the pipeline with default [`LayerConfig`].
pub fn init_tracing(sink: Arc<dyn LogSink>, meta: Arc<KubeMetadata>) -> Result<(), InitError> {
    init_tracing_with_config(sink, meta, LayerConfig::default())
}

/// The hassle-free entrypoint: resolve the conventional Kubernetes
/// metadata spec once, derive the key order from whatever was found,
/// and emit JSON lines on stdout.
///
/// Outside a cluster this degrades silently: no sources resolve, the
/// metadata map is empty, and records carry only base and caller fields.
pub fn init_kube_json_stdout() -> Result<(), InitError> {
    init_kube_json_stdout_with(MetaSpec::kube(), LayerConfig::default())
}

/// Like [`init_kube_json_stdout`] but with a caller-supplied metadata
/// spec and layer config.
pub fn init_kube_json_stdout_with(spec: MetaSpec, config: LayerConfig) -> Result<(), InitError> {
    spec.validate()?;
    let resolver = CachedResolver::new(spec);
    let meta = Arc::new(resolver.resolve().clone());
    let format = FormatSpec::derive(&meta);
    let sink = Arc::new(ConsoleSink::stdout(format));
    init_tracing_with_config(sink, meta, config)
}

/// Like [`init_kube_json_stdout`], but with the output stream picked
/// from the `LOG_TARGET` env var (`stdout` when unset), so deployments
/// can route records to stderr or silence them without a rebuild.
pub fn init_kube_json_from_env() -> Result<(), InitError> {
    let spec = MetaSpec::kube();
    spec.validate()?;
    let resolver = CachedResolver::new(spec);
    let meta = Arc::new(resolver.resolve().clone());
    let format = FormatSpec::derive(&meta);
    let target = env::env_or(env::LOG_TARGET_ENV, "stdout");
    let sink = make_sink(&target, format)?;
    init_tracing_with_config(sink, meta, LayerConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(LayerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_buffer_is_rejected() {
        let config = LayerConfig { channel_buffer: 0, ..LayerConfig::default() };
        assert!(matches!(config.validate(), Err(InitError::ZeroChannelBuffer)));
    }

    #[test]
    fn zero_batch_is_rejected() {
        let config = LayerConfig { batch_size: 0, ..LayerConfig::default() };
        assert!(matches!(config.validate(), Err(InitError::ZeroBatchSize)));
    }
}
