use std::sync::Arc;

use crate::console::{ConsoleSink, ConsoleStream};
use crate::format::FormatSpec;
use crate::noop_sink::NoopSink;
use crate::sink::LogSink;

/// Supported output targets selectable by name from deployment config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Stdout,
    Stderr,
    Noop,
}

/// Parse a target name into a [`SinkKind`].
///
/// Accepted names: `stdout`, `stderr`, `noop`. Matching is
/// case-insensitive so values can come straight from env vars.
pub fn parse_target(target: &str) -> Result<SinkKind, TargetError> {
    match target.trim().to_ascii_lowercase().as_str() {
        "stdout" => Ok(SinkKind::Stdout),
        "stderr" => Ok(SinkKind::Stderr),
        "noop" => Ok(SinkKind::Noop),
        other => Err(TargetError::UnknownTarget(other.to_string())),
    }
}

/// Error type returned when parsing a sink target name.
#[derive(thiserror::Error, Debug)]
pub enum TargetError {
    #[error("unknown sink target: {0}")]
    UnknownTarget(String),
}

/// Create a concrete [`LogSink`] for a target name.
///
/// This is the entry point for applications that pick their output
/// stream from configuration instead of constructing sinks manually.
pub fn make_sink(target: &str, spec: FormatSpec) -> Result<Arc<dyn LogSink>, TargetError> {
    let kind = parse_target(target)?;
    Ok(match kind {
        SinkKind::Stdout => Arc::new(ConsoleSink::new(spec, ConsoleStream::Stdout)),
        SinkKind::Stderr => Arc::new(ConsoleSink::new(spec, ConsoleStream::Stderr)),
        SinkKind::Noop => Arc::new(NoopSink),
    })
}
