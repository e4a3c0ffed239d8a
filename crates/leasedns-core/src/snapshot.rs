//! Active snapshot normalization
//!
//! Sources hand raw leases to [`active_snapshot`] before returning them.
//! The result contains no expired leases and at most one lease per key.

use crate::lease::{CacheKey, KeyStrategy, Lease};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Reduce raw leases to the active snapshot at `now`
///
/// - Leases whose expiry is strictly before `now` are dropped.
/// - When several leases share a key, the one with the later expiry wins
///   (no expiry counts as latest); on a tie the later entry in `raw` wins.
///
/// Output order follows the first appearance of each key in `raw`.
pub fn active_snapshot<I>(raw: I, now: DateTime<Utc>, strategy: KeyStrategy) -> Vec<Lease>
where
    I: IntoIterator<Item = Lease>,
{
    let mut snapshot: Vec<Lease> = Vec::new();
    let mut index: HashMap<CacheKey, usize> = HashMap::new();

    for lease in raw {
        if lease.is_expired(now) {
            debug!(
                "Lease expired: [{}: {}] in scope {}",
                lease.hostname, lease.address, lease.scope
            );
            continue;
        }

        let key = lease.key(strategy);
        match index.get(&key) {
            Some(&slot) => {
                if compare_expiry(&lease, &snapshot[slot]) != Ordering::Less {
                    debug!("Lease for {} superseded by a later entry", key);
                    snapshot[slot] = lease;
                }
            }
            None => {
                index.insert(key, snapshot.len());
                snapshot.push(lease);
            }
        }
    }

    snapshot
}

/// Order two leases by expiry, treating a missing expiry as infinitely late
fn compare_expiry(a: &Lease, b: &Lease) -> Ordering {
    match (a.expiry, b.expiry) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(&b),
    }
}
