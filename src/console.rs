use async_trait::async_trait;
use std::error::Error;
use std::io::Write;

use crate::format::FormatSpec;
use crate::record::LogRecord;
use crate::sink::LogSink;

/// Which process stream a [`ConsoleSink`] writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

/// Sink that writes one JSON object per line to stdout or stderr.
///
/// This is the contract an EFK/ELK collector expects from a container:
/// structured records on the process streams, picked up by the node's
/// log agent. Rendering follows the [`FormatSpec`] derived at startup,
/// so every line carries the same key order.
pub struct ConsoleSink {
    spec: FormatSpec,
    stream: ConsoleStream,
}

impl ConsoleSink {
    pub fn new(spec: FormatSpec, stream: ConsoleStream) -> Self {
        ConsoleSink { spec, stream }
    }

    /// JSON lines on stdout, the usual choice for access/application logs.
    pub fn stdout(spec: FormatSpec) -> Self {
        ConsoleSink::new(spec, ConsoleStream::Stdout)
    }

    /// JSON lines on stderr, for error-channel handlers.
    pub fn stderr(spec: FormatSpec) -> Self {
        ConsoleSink::new(spec, ConsoleStream::Stderr)
    }

    pub fn spec(&self) -> &FormatSpec {
        &self.spec
    }
}

#[async_trait]
impl LogSink for ConsoleSink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let line = self.spec.render_line(record);
        match self.stream {
            ConsoleStream::Stdout => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                writeln!(handle, "{}", line)?;
            }
            ConsoleStream::Stderr => {
                let stderr = std::io::stderr();
                let mut handle = stderr.lock();
                writeln!(handle, "{}", line)?;
            }
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        match self.stream {
            ConsoleStream::Stdout => std::io::stdout().flush()?,
            ConsoleStream::Stderr => std::io::stderr().flush()?,
        }
        Ok(())
    }
}
