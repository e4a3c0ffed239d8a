//! Lease data model
//!
//! A [`Lease`] is the normalized form every source produces, whatever the
//! on-disk format. Addresses are held as [`IpAddr`] so that equality and
//! textual output are canonical no matter how the source spelled them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Namespace boundary for cache entries, one per backing lease file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Scope(String);

impl Scope {
    /// Create a scope from its identifier (usually a file name)
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The scope identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scope {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A single address assignment observed in a lease source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Assigned address
    pub address: IpAddr,
    /// Client hostname, without the domain suffix
    pub hostname: String,
    /// Absolute expiry; `None` means the lease never expires
    pub expiry: Option<DateTime<Utc>>,
    /// Scope the lease was read from
    pub scope: Scope,
}

impl Lease {
    /// Create a lease
    pub fn new(
        scope: Scope,
        hostname: impl Into<String>,
        address: IpAddr,
        expiry: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            address,
            hostname: hostname.into(),
            expiry,
            scope,
        }
    }

    /// Whether the lease has expired at `now`
    ///
    /// A lease expiring exactly at `now` is still active.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry < now)
    }

    /// The cache key for this lease under the given strategy
    pub fn key(&self, strategy: KeyStrategy) -> CacheKey {
        match strategy {
            KeyStrategy::Hostname => CacheKey::Hostname(self.hostname.clone()),
            KeyStrategy::Address => CacheKey::Address(self.address),
        }
    }
}

/// How a source identifies "the same lease" across reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// One lease per hostname per scope
    Hostname,
    /// One lease per address per scope
    Address,
}

/// Identity of a cache entry within a scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    /// Keyed by client hostname
    Hostname(String),
    /// Keyed by assigned address
    Address(IpAddr),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Hostname(hostname) => f.write_str(hostname),
            CacheKey::Address(address) => write!(f, "{}", address),
        }
    }
}

/// Normalize a hostname reported by a lease source
///
/// Returns `Ok(None)` when the source reported no hostname (the lease is
/// then ignored), and `Err` with a reason when the name cannot be used as
/// a DNS owner name.
pub fn normalize_hostname(raw: &str) -> std::result::Result<Option<String>, String> {
    let trimmed = raw.trim().trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "*" {
        return Ok(None);
    }

    if trimmed.len() > 253 {
        return Err(format!("hostname too long: {} chars", trimmed.len()));
    }

    for label in trimmed.split('.') {
        if label.is_empty() {
            return Err(format!("hostname has an empty label: '{}'", trimmed));
        }
        if label.len() > 63 {
            return Err(format!("hostname label too long: '{}'", label));
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!("hostname contains invalid characters: '{}'", trimmed));
        }
    }

    Ok(Some(trimmed.to_ascii_lowercase()))
}
