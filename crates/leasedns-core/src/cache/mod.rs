// # Lease Cache
//
// Process-lifetime record of what has been applied to the resolver.
//
// ## Purpose
//
// The cache remembers, per scope, which lease each key was last applied
// as. The reconciler diffs fresh snapshots against it to emit only the
// record operations that actually change something.
//
// ## Crash Behavior
//
// - State lives in memory only and is lost on restart
// - The first pass after a restart re-adds every active lease
// - Re-adding records the resolver already holds is harmless
//
// ## Ownership
//
// The cache is a plain owned value with `&mut` mutators. The engine owns
// exactly one instance, so there is a single writer and no lock.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use crate::lease::{CacheKey, Lease, Scope};

/// Last lease state applied to the resolver for one `(scope, key)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Address the records were published for
    pub address: IpAddr,
    /// Hostname the records were published for
    pub hostname: String,
}

impl CacheEntry {
    /// Create an entry from a lease
    pub fn from_lease(lease: &Lease) -> Self {
        Self {
            address: lease.address,
            hostname: lease.hostname.clone(),
        }
    }

    /// Whether the lease would publish the same records as this entry
    pub fn matches(&self, lease: &Lease) -> bool {
        self.address == lease.address && self.hostname == lease.hostname
    }
}

/// In-memory map of scope to keyed cache entries
///
/// # Example
///
/// ```rust
/// use leasedns_core::cache::{CacheEntry, LeaseCache};
/// use leasedns_core::lease::{CacheKey, Lease, Scope};
///
/// let mut cache = LeaseCache::new();
/// let scope = Scope::new("eth0");
/// let lease = Lease::new(scope.clone(), "printer", "192.0.2.5".parse().unwrap(), None);
///
/// cache.put(&scope, CacheKey::Hostname("printer".into()), CacheEntry::from_lease(&lease));
/// assert_eq!(cache.keys_in_scope(&scope).len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LeaseCache {
    scopes: BTreeMap<Scope, BTreeMap<CacheKey, CacheEntry>>,
}

impl LeaseCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the entry for a key in a scope
    pub fn get(&self, scope: &Scope, key: &CacheKey) -> Option<&CacheEntry> {
        self.scopes.get(scope).and_then(|entries| entries.get(key))
    }

    /// Insert or replace the entry for a key, returning the previous one
    pub fn put(&mut self, scope: &Scope, key: CacheKey, entry: CacheEntry) -> Option<CacheEntry> {
        self.scopes
            .entry(scope.clone())
            .or_default()
            .insert(key, entry)
    }

    /// Remove the entry for a key
    ///
    /// Removing the last key of a scope also forgets the scope.
    pub fn remove(&mut self, scope: &Scope, key: &CacheKey) -> Option<CacheEntry> {
        let entries = self.scopes.get_mut(scope)?;
        let removed = entries.remove(key);
        if entries.is_empty() {
            self.scopes.remove(scope);
        }
        removed
    }

    /// Drop a whole scope, returning every entry it held
    pub fn remove_scope(&mut self, scope: &Scope) -> Vec<(CacheKey, CacheEntry)> {
        self.scopes
            .remove(scope)
            .map(|entries| entries.into_iter().collect())
            .unwrap_or_default()
    }

    /// Keys currently cached for a scope
    pub fn keys_in_scope(&self, scope: &Scope) -> BTreeSet<CacheKey> {
        self.scopes
            .get(scope)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Scopes that currently hold at least one entry
    pub fn scopes(&self) -> Vec<Scope> {
        self.scopes.keys().cloned().collect()
    }

    /// Total number of entries across all scopes
    pub fn len(&self) -> usize {
        self.scopes.values().map(BTreeMap::len).sum()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
