use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Destination for metadata-stamped [`LogRecord`]s.
///
/// Implementations render and deliver records to a concrete output
/// (stdout for an EFK collector, stderr, a buffer in tests). The layer
/// calls `send` from a background task and never awaits it on the
/// application thread, so a slow sink cannot stall logging call sites.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver a single record to the underlying output.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was accepted.
    /// - `Err(..)` on delivery failure; the layer treats this as
    ///   transient and retries the batch with backoff.
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered records, if the sink buffers at all.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
