// # leasedns-core
//
// Core library for keeping a resolver's local records in step with
// DHCP/SLAAC leases.
//
// ## Architecture Overview
//
// - **LeaseSource**: Reads normalized lease snapshots, one scope at a time
// - **RecordSink**: Applies batched record removals/additions to the resolver
// - **LeaseCache**: Owned, in-memory record of what has been applied
// - **Reconciler**: Diffs a snapshot against the cache into a record delta
// - **LeaseEngine**: Drives the reconciler by polling or on file events
// - **Registry**: Plugin-based registry for sources and sinks
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Diffing is pure; I/O lives behind traits
// 2. **Single Writer**: The engine owns the only cache; no global state
// 3. **Plugin-Based**: Formats and sinks are registered, not hard-coded
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: Re-reconciling an unchanged snapshot emits nothing

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod lease;
pub mod reconciler;
pub mod record;
pub mod registry;
pub mod snapshot;
pub mod traits;

// Re-export core types for convenience
pub use cache::{CacheEntry, LeaseCache};
pub use config::{SinkConfig, SourceConfig, TriggerConfig, WatcherConfig};
pub use engine::{EngineEvent, LeaseEngine};
pub use error::{Error, Result};
pub use lease::{CacheKey, KeyStrategy, Lease, Scope};
pub use reconciler::Reconciler;
pub use record::{RecordDelta, RecordKind, ResourceRecord};
pub use registry::Registry;
pub use traits::{LeaseSource, RecordSink, ScopeEvent};
