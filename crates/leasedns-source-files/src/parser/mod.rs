//! Lease file parsers
//!
//! Each parser turns the full text of one lease file into raw [`Lease`]
//! values for a scope. Parsers do not filter expired leases or duplicates;
//! [`crate::FileLeaseSource`] runs the result through
//! [`leasedns_core::snapshot::active_snapshot`].
//!
//! A malformed entry is logged and skipped. Only a file that cannot be
//! interpreted at all (not JSON, no CSV header) fails the whole parse.

mod dnsmasq;
mod kea;
mod networkd;
mod slaac;

pub use dnsmasq::DnsmasqParser;
pub use kea::KeaParser;
pub use networkd::NetworkdParser;
pub use slaac::SlaacParser;

use leasedns_core::lease::{normalize_hostname, KeyStrategy, Lease, Scope};
use leasedns_core::Result;
use std::path::Path;
use tracing::{debug, warn};

/// Parser for one on-disk lease format
pub trait LeaseParser: Send + Sync + 'static {
    /// Format name, as used in configuration
    fn name(&self) -> &'static str;

    /// How leases of this format are keyed
    fn key_strategy(&self) -> KeyStrategy;

    /// Whether a file in a watched directory belongs to this format
    fn accepts(&self, _path: &Path) -> bool {
        true
    }

    /// Parse the whole content of `path` into raw leases for `scope`
    fn parse(&self, scope: &Scope, path: &Path, content: &str) -> Result<Vec<Lease>>;
}

/// Validate a raw hostname for one entry, logging why it was dropped
pub(crate) fn entry_hostname(path: &Path, entry: usize, raw: &str) -> Option<String> {
    match normalize_hostname(raw) {
        Ok(Some(hostname)) => Some(hostname),
        Ok(None) => {
            debug!("Lease entry {} in {} has no hostname, ignoring", entry, path.display());
            None
        }
        Err(reason) => {
            warn!("Skipping lease entry {} in {}: {}", entry, path.display(), reason);
            None
        }
    }
}

/// Log a malformed entry
pub(crate) fn skip_entry(path: &Path, entry: usize, reason: impl std::fmt::Display) {
    warn!("Skipping lease entry {} in {}: {}", entry, path.display(), reason);
}
