//! Kea memfile (CSV) lease file
//!
//! The first line is a header naming the columns; `address`, `hostname`
//! and `expire` are required, `state` is honored when present. Kea appends
//! a new row on every renewal, so several rows per address are normal.

use super::{entry_hostname, skip_entry, LeaseParser};
use chrono::DateTime;
use leasedns_core::lease::{KeyStrategy, Lease, Scope};
use leasedns_core::{Error, Result};
use std::net::IpAddr;
use std::path::Path;
use tracing::debug;

/// Lease state for an assigned (default) lease
const STATE_DEFAULT: &str = "0";

/// Parser for Kea's `kea-leases4.csv` / `kea-leases6.csv`
#[derive(Debug, Default, Clone, Copy)]
pub struct KeaParser;

struct Columns {
    address: usize,
    hostname: usize,
    expire: usize,
    state: Option<usize>,
}

impl Columns {
    fn from_header(path: &Path, header: &str) -> Result<Self> {
        let names: Vec<&str> = header.split(',').map(str::trim).collect();
        let find = |name: &str| names.iter().position(|column| *column == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                Error::source_parse(path, format!("CSV header has no '{}' column", name))
            })
        };

        Ok(Self {
            address: require("address")?,
            hostname: require("hostname")?,
            expire: require("expire")?,
            state: find("state"),
        })
    }
}

impl LeaseParser for KeaParser {
    fn name(&self) -> &'static str {
        "kea"
    }

    fn key_strategy(&self) -> KeyStrategy {
        KeyStrategy::Address
    }

    fn parse(&self, scope: &Scope, path: &Path, content: &str) -> Result<Vec<Lease>> {
        let mut lines = content.lines().enumerate().filter(|(_, line)| !line.trim().is_empty());
        let Some((_, header)) = lines.next() else {
            return Ok(Vec::new());
        };
        let columns = Columns::from_header(path, header)?;

        let mut leases = Vec::new();
        for (idx, line) in lines {
            let entry = idx + 1;
            let fields: Vec<&str> = line.split(',').collect();
            let field = |column: usize| fields.get(column).map(|value| value.trim());

            let (Some(address), Some(hostname), Some(expire)) = (
                field(columns.address),
                field(columns.hostname),
                field(columns.expire),
            ) else {
                skip_entry(path, entry, format!("row has only {} fields", fields.len()));
                continue;
            };

            if let Some(state) = columns.state.and_then(field)
                && state != STATE_DEFAULT
            {
                debug!("Lease {} in state {} ignored", address, state);
                continue;
            }

            let address = match address.parse::<IpAddr>() {
                Ok(address) => address,
                Err(e) => {
                    skip_entry(path, entry, format!("invalid address '{}': {}", address, e));
                    continue;
                }
            };

            let expiry = match expire.parse::<i64>().ok().and_then(|secs| DateTime::from_timestamp(secs, 0)) {
                Some(expiry) => expiry,
                None => {
                    skip_entry(path, entry, format!("invalid expire '{}'", expire));
                    continue;
                }
            };

            // Kea escapes commas inside fields
            let hostname = hostname.replace("&#x2c", ",");
            let Some(hostname) = entry_hostname(path, entry, &hostname) else {
                continue;
            };

            leases.push(Lease::new(scope.clone(), hostname, address, Some(expiry)));
        }

        Ok(leases)
    }
}
