// # Lease Source Trait
//
// Defines the interface for reading lease snapshots and observing changes
// to the files that back them.
//
// ## Implementations
//
// - File/directory backed: `leasedns-source-files` crate (dnsmasq, Kea CSV,
//   systemd-networkd JSON, SLAAC JSON)
//
// ## Usage
//
// ```rust,ignore
// use leasedns_core::LeaseSource;
//
// let source = /* LeaseSource implementation */;
//
// for scope in source.scopes().await? {
//     let snapshot = source.read(&scope, chrono::Utc::now()).await?;
//     println!("{}: {} active leases", scope, snapshot.len());
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::pin::Pin;
use tokio_stream::Stream;

use crate::lease::{KeyStrategy, Lease, Scope};

/// A filesystem change affecting one scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeEvent {
    /// The backing file appeared
    Created(Scope),
    /// The backing file was written
    Modified(Scope),
    /// The backing file disappeared
    Deleted(Scope),
}

impl ScopeEvent {
    /// The scope the event refers to
    pub fn scope(&self) -> &Scope {
        match self {
            ScopeEvent::Created(scope) | ScopeEvent::Modified(scope) | ScopeEvent::Deleted(scope) => {
                scope
            }
        }
    }
}

/// Stream of scope change events
pub type ScopeEventStream = Pin<Box<dyn Stream<Item = ScopeEvent> + Send + 'static>>;

/// Trait for lease source implementations
///
/// A source turns a backend-specific lease representation into normalized
/// [`Lease`] snapshots, one scope at a time.
///
/// # Contract
///
/// - `read` tolerates malformed entries: it skips and logs them and never
///   fails the whole read because of one bad line.
/// - `read` returns an *active* snapshot: expired leases removed and at
///   most one lease per key, the latest-expiring one winning (see
///   [`crate::snapshot::active_snapshot`]).
/// - A missing or unreadable path is reported as
///   [`crate::Error::SourcePath`]; the engine decides whether that is fatal.
///
/// # Forbidden Capabilities
/// - ❌ Touch the resolver (owned by `RecordSink`)
/// - ❌ Keep reconciliation state (owned by `LeaseCache`)
/// - ❌ Decide when to re-read (owned by `LeaseEngine`)
#[async_trait]
pub trait LeaseSource: Send + Sync {
    /// List the scopes currently backed by the source
    ///
    /// A single-file source returns exactly one scope. A directory source
    /// returns one scope per lease file.
    async fn scopes(&self) -> Result<Vec<Scope>, crate::Error>;

    /// Read the active snapshot of one scope at evaluation time `now`
    async fn read(&self, scope: &Scope, now: DateTime<Utc>) -> Result<Vec<Lease>, crate::Error>;

    /// Subscribe to create/modify/delete notifications for the source
    ///
    /// The returned stream owns whatever resources back it; dropping the
    /// stream stops the subscription.
    fn watch(&self) -> Result<ScopeEventStream, crate::Error> {
        Err(crate::Error::watch(format!(
            "{} source does not support change notifications",
            self.source_name()
        )))
    }

    /// How leases from this source are keyed
    fn key_strategy(&self) -> KeyStrategy;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing lease sources from configuration
pub trait LeaseSourceFactory: Send + Sync {
    /// Create a LeaseSource instance from configuration
    fn create(
        &self,
        config: &crate::config::SourceConfig,
    ) -> Result<Box<dyn LeaseSource>, crate::Error>;
}
