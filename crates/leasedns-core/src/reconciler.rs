//! Snapshot-to-cache diffing
//!
//! The [`Reconciler`] compares an active snapshot for one scope against the
//! [`LeaseCache`], mutates the cache to match, and returns the record
//! operations needed to bring the resolver to the same state.
//!
//! ## Algorithm
//!
//! 1. For each lease in the snapshot:
//!    - key not cached → add its PTR and forward record
//!    - cached with the same address and hostname → nothing
//!    - cached with a different address or hostname → remove the old pair,
//!      add the new pair
//! 2. For each cached key of the scope absent from the snapshot → remove
//!    its pair and forget it.
//!
//! Running the same snapshot twice yields an empty delta the second time.

use std::collections::HashSet;
use tracing::{debug, info};

use crate::cache::{CacheEntry, LeaseCache};
use crate::lease::{KeyStrategy, Lease, Scope};
use crate::record::{RecordDelta, record_pair};

/// Diffs snapshots against the cache and builds record operations
#[derive(Debug, Clone)]
pub struct Reconciler {
    /// Domain suffix appended to every hostname
    domain: String,
    /// How leases are keyed within a scope
    key_strategy: KeyStrategy,
}

impl Reconciler {
    /// Create a reconciler for a domain suffix and key strategy
    pub fn new(domain: impl Into<String>, key_strategy: KeyStrategy) -> Self {
        Self {
            domain: domain.into(),
            key_strategy,
        }
    }

    /// Converge the cache for `scope` to `snapshot` and return the delta
    ///
    /// `snapshot` must already be active (no expired leases, one lease per
    /// key). Leases with an empty hostname are ignored.
    pub fn reconcile(
        &self,
        cache: &mut LeaseCache,
        scope: &Scope,
        snapshot: &[Lease],
    ) -> RecordDelta {
        let mut delta = RecordDelta::new();
        let mut seen = HashSet::new();

        for lease in snapshot {
            if lease.hostname.is_empty() {
                continue;
            }

            let key = lease.key(self.key_strategy);
            seen.insert(key.clone());

            match cache.get(scope, &key) {
                Some(entry) if entry.matches(lease) => {
                    debug!("No change in lease for {} in scope {}", key, scope);
                }
                Some(entry) => {
                    info!(
                        "Lease for {} in scope {} changed from {} ({}) to {} ({})",
                        key, scope, entry.address, entry.hostname, lease.address, lease.hostname
                    );
                    delta
                        .removed
                        .extend(record_pair(&entry.hostname, &self.domain, entry.address));
                    delta
                        .added
                        .extend(record_pair(&lease.hostname, &self.domain, lease.address));
                    cache.put(scope, key, CacheEntry::from_lease(lease));
                }
                None => {
                    info!(
                        "New lease in scope {}: {} with address {}",
                        scope, lease.hostname, lease.address
                    );
                    delta
                        .added
                        .extend(record_pair(&lease.hostname, &self.domain, lease.address));
                    cache.put(scope, key, CacheEntry::from_lease(lease));
                }
            }
        }

        for key in cache.keys_in_scope(scope) {
            if seen.contains(&key) {
                continue;
            }
            if let Some(entry) = cache.remove(scope, &key) {
                info!(
                    "Lease no longer active in scope {}: {} ({})",
                    scope, entry.hostname, entry.address
                );
                delta
                    .removed
                    .extend(record_pair(&entry.hostname, &self.domain, entry.address));
            }
        }

        delta
    }

    /// Forget a whole scope and return removals for everything it held
    pub fn remove_scope(&self, cache: &mut LeaseCache, scope: &Scope) -> RecordDelta {
        let mut delta = RecordDelta::new();
        for (key, entry) in cache.remove_scope(scope) {
            info!(
                "Removing lease {} ({}) of deleted scope {}",
                key, entry.address, scope
            );
            delta
                .removed
                .extend(record_pair(&entry.hostname, &self.domain, entry.address));
        }
        delta
    }
}
