//! SLAAC resolver lease file
//!
//! A JSON array of observed hosts, one file per interface. `Address` is an
//! array of eight hextets (hex strings or integers) or sixteen octets;
//! `Expire` is optional and may be epoch seconds or an RFC 3339 timestamp.

use super::networkd::address_from_octets;
use super::{entry_hostname, skip_entry, LeaseParser};
use chrono::{DateTime, Utc};
use leasedns_core::lease::{KeyStrategy, Lease, Scope};
use leasedns_core::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::net::{IpAddr, Ipv6Addr};
use std::path::Path;

/// Parser for `*.json` files written by a SLAAC resolver
#[derive(Debug, Default, Clone, Copy)]
pub struct SlaacParser;

#[derive(Deserialize)]
struct SlaacLease {
    #[serde(rename = "Address")]
    address: Vec<Value>,
    #[serde(rename = "Hostname", default)]
    hostname: Option<String>,
    #[serde(rename = "Expire", default)]
    expire: Option<Value>,
}

fn parse_address(parts: &[Value]) -> std::result::Result<IpAddr, String> {
    match parts.len() {
        8 => {
            let mut hextets = [0u16; 8];
            for (slot, part) in hextets.iter_mut().zip(parts) {
                *slot = match part {
                    Value::String(hex) => u16::from_str_radix(hex, 16)
                        .map_err(|e| format!("invalid hextet '{}': {}", hex, e))?,
                    // an integer is the hextet value itself, not its hex digits
                    Value::Number(n) => n
                        .as_u64()
                        .and_then(|n| u16::try_from(n).ok())
                        .ok_or_else(|| format!("invalid hextet {}", n))?,
                    other => return Err(format!("invalid hextet {}", other)),
                };
            }
            Ok(IpAddr::V6(Ipv6Addr::from(hextets)))
        }
        16 => {
            let octets = parts
                .iter()
                .map(|part| part.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect::<Option<Vec<u8>>>()
                .ok_or_else(|| "address octets must be integers 0-255".to_string())?;
            address_from_octets(&octets).ok_or_else(|| "invalid address octets".to_string())
        }
        n => Err(format!("address has {} parts", n)),
    }
}

fn parse_expire(value: &Value) -> std::result::Result<Option<DateTime<Utc>>, String> {
    let secs = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_i64().ok_or_else(|| format!("invalid expire {}", n))?,
        Value::String(text) => match text.trim().parse::<i64>() {
            Ok(secs) => secs,
            Err(_) => {
                return DateTime::parse_from_rfc3339(text.trim())
                    .map(|expiry| Some(expiry.with_timezone(&Utc)))
                    .map_err(|e| format!("invalid expire '{}': {}", text, e));
            }
        },
        other => return Err(format!("invalid expire {}", other)),
    };

    DateTime::from_timestamp(secs, 0)
        .map(Some)
        .ok_or_else(|| format!("expire out of range: {}", secs))
}

impl LeaseParser for SlaacParser {
    fn name(&self) -> &'static str {
        "slaac"
    }

    fn key_strategy(&self) -> KeyStrategy {
        KeyStrategy::Hostname
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "json")
    }

    fn parse(&self, scope: &Scope, path: &Path, content: &str) -> Result<Vec<Lease>> {
        let entries: Vec<Value> = serde_json::from_str(content)
            .map_err(|e| Error::source_parse(path, format!("not a JSON array of leases: {}", e)))?;

        let mut leases = Vec::new();
        for (idx, value) in entries.into_iter().enumerate() {
            let entry = idx + 1;
            let lease: SlaacLease = match serde_json::from_value(value) {
                Ok(lease) => lease,
                Err(e) => {
                    skip_entry(path, entry, e);
                    continue;
                }
            };

            let address = match parse_address(&lease.address) {
                Ok(address) => address,
                Err(reason) => {
                    skip_entry(path, entry, reason);
                    continue;
                }
            };

            let expiry = match lease.expire.as_ref().map(parse_expire).transpose() {
                Ok(expiry) => expiry.flatten(),
                Err(reason) => {
                    skip_entry(path, entry, reason);
                    continue;
                }
            };

            let Some(hostname) = entry_hostname(path, entry, lease.hostname.as_deref().unwrap_or("")) else {
                continue;
            };

            leases.push(Lease::new(scope.clone(), hostname, address, expiry));
        }

        Ok(leases)
    }
}
