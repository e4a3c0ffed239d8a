//! Resource records derived from leases
//!
//! Every lease maps to a pair of records: a PTR under the reverse zone and
//! a forward A/AAAA record under the configured domain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// DNS record type emitted for a lease
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
    /// IPv4 forward record
    A,
    /// IPv6 forward record
    Aaaa,
    /// Reverse pointer record
    Ptr,
}

impl RecordKind {
    /// Wire mnemonic for the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
            RecordKind::Ptr => "PTR",
        }
    }

    /// Forward record type for an address family
    pub fn forward_for(address: &IpAddr) -> Self {
        match address {
            IpAddr::V4(_) => RecordKind::A,
            IpAddr::V6(_) => RecordKind::Aaaa,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single resource record in the resolver's local data
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Owner name
    pub owner: String,
    /// Record type
    pub kind: RecordKind,
    /// Record data (address or target name)
    pub value: String,
}

impl ResourceRecord {
    /// Forward record `fqdn -> address`
    pub fn forward(fqdn: &str, address: IpAddr) -> Self {
        Self {
            owner: fqdn.to_string(),
            kind: RecordKind::forward_for(&address),
            value: address.to_string(),
        }
    }

    /// Reverse record `reverse-pointer(address) -> fqdn`
    pub fn reverse(fqdn: &str, address: IpAddr) -> Self {
        Self {
            owner: reverse_pointer(&address),
            kind: RecordKind::Ptr,
            value: fqdn.to_string(),
        }
    }

    /// Line accepted by the resolver's batch add command
    pub fn add_line(&self) -> String {
        format!("{} IN {} {}", self.owner, self.kind, self.value)
    }

    /// Line accepted by the resolver's batch remove command
    pub fn remove_line(&self) -> String {
        self.owner.clone()
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.add_line())
    }
}

/// The PTR and forward record for one host, in that order
pub fn record_pair(hostname: &str, domain: &str, address: IpAddr) -> [ResourceRecord; 2] {
    let fqdn = fqdn(hostname, domain);
    [
        ResourceRecord::reverse(&fqdn, address),
        ResourceRecord::forward(&fqdn, address),
    ]
}

/// Fully qualified name for a lease hostname
pub fn fqdn(hostname: &str, domain: &str) -> String {
    let domain = domain.trim_matches('.');
    if domain.is_empty() {
        hostname.to_string()
    } else {
        format!("{}.{}", hostname, domain)
    }
}

/// Reverse-zone owner name for an address, without trailing dot
pub fn reverse_pointer(address: &IpAddr) -> String {
    match address {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{}.{}.{}.{}.in-addr.arpa", d, c, b, a)
        }
        IpAddr::V6(v6) => {
            let mut name = String::with_capacity(72);
            for byte in v6.octets().iter().rev() {
                name.push_str(&format!("{:x}.{:x}.", byte & 0x0f, byte >> 4));
            }
            name.push_str("ip6.arpa");
            name
        }
    }
}

/// Record operations produced by one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDelta {
    /// Records to add to the resolver
    pub added: Vec<ResourceRecord>,
    /// Records to remove from the resolver
    pub removed: Vec<ResourceRecord>,
}

impl RecordDelta {
    /// Create an empty delta
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the pass produced any operation
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}
