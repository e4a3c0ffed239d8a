//! systemd-networkd DHCP server lease file
//!
//! A JSON object whose `Leases` array holds one object per lease, with the
//! address as an octet array and the expiry in epoch microseconds.

use super::{entry_hostname, skip_entry, LeaseParser};
use chrono::{DateTime, Utc};
use leasedns_core::lease::{KeyStrategy, Lease, Scope};
use leasedns_core::{Error, Result};
use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;

/// Parser for files under `/run/systemd/netif/leases/`
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkdParser;

#[derive(Deserialize)]
struct LeaseFile {
    #[serde(rename = "Leases", default)]
    leases: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct NetworkdLease {
    #[serde(rename = "Address")]
    address: Vec<u8>,
    #[serde(rename = "Hostname", default)]
    hostname: Option<String>,
    #[serde(rename = "ExpirationRealtimeUSec")]
    expiration_usec: Option<i64>,
}

/// An octet array as an address
pub(crate) fn address_from_octets(octets: &[u8]) -> Option<IpAddr> {
    match octets.len() {
        4 => <[u8; 4]>::try_from(octets).ok().map(IpAddr::from),
        16 => <[u8; 16]>::try_from(octets).ok().map(IpAddr::from),
        _ => None,
    }
}

impl LeaseParser for NetworkdParser {
    fn name(&self) -> &'static str {
        "networkd"
    }

    fn key_strategy(&self) -> KeyStrategy {
        KeyStrategy::Address
    }

    fn parse(&self, scope: &Scope, path: &Path, content: &str) -> Result<Vec<Lease>> {
        let file: LeaseFile = serde_json::from_str(content)
            .map_err(|e| Error::source_parse(path, format!("not a networkd lease file: {}", e)))?;

        let mut leases = Vec::new();
        for (idx, value) in file.leases.into_iter().enumerate() {
            let entry = idx + 1;
            let lease: NetworkdLease = match serde_json::from_value(value) {
                Ok(lease) => lease,
                Err(e) => {
                    skip_entry(path, entry, e);
                    continue;
                }
            };

            let Some(address) = address_from_octets(&lease.address) else {
                skip_entry(path, entry, format!("address has {} octets", lease.address.len()));
                continue;
            };

            let Some(hostname) = entry_hostname(path, entry, lease.hostname.as_deref().unwrap_or("")) else {
                continue;
            };

            // A lease without an expiration is treated as already expired
            let expiry = match lease.expiration_usec {
                Some(usec) => match DateTime::from_timestamp_micros(usec) {
                    Some(expiry) => expiry,
                    None => {
                        skip_entry(path, entry, format!("expiration out of range: {}", usec));
                        continue;
                    }
                },
                None => DateTime::<Utc>::UNIX_EPOCH,
            };

            leases.push(Lease::new(scope.clone(), hostname, address, Some(expiry)));
        }

        Ok(leases)
    }
}
