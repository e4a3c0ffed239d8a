// # Record Sink Trait
//
// Defines the interface for applying record batches to the resolver.
//
// ## Implementations
//
// - unbound-control: `leasedns-sink-unbound` crate
//
// ## Usage
//
// ```rust,ignore
// use leasedns_core::RecordSink;
//
// let sink = /* RecordSink implementation */;
// sink.apply(&delta.removed, &delta.added).await?;
// ```

use async_trait::async_trait;

use crate::record::ResourceRecord;

/// Trait for record sink implementations
///
/// # Batching
///
/// `apply` sends the whole `removed` batch first, then the whole `added`
/// batch, each as one call to the resolver's control interface. Batches
/// are never interleaved or split further. An empty batch is not sent.
///
/// # Failure
///
/// A failed call is reported as [`crate::Error::SinkApply`]. Sinks do not
/// retry; the engine logs the failure and moves on.
///
/// # Forbidden Capabilities
/// - ❌ Retry or back off (a later reconciliation supersedes the call)
/// - ❌ Read lease sources or the cache
/// - ❌ Decide which records are needed (owned by `Reconciler`)
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Remove then add the given records
    async fn apply(
        &self,
        removed: &[ResourceRecord],
        added: &[ResourceRecord],
    ) -> Result<(), crate::Error>;

    /// Get the sink name (for logging/debugging)
    fn sink_name(&self) -> &'static str;
}

/// Helper trait for constructing record sinks from configuration
pub trait RecordSinkFactory: Send + Sync {
    /// Create a RecordSink instance from configuration
    fn create(&self, config: &crate::config::SinkConfig)
    -> Result<Box<dyn RecordSink>, crate::Error>;
}
