//! dnsmasq lease file
//!
//! One lease per line: `<expiry> <mac|iaid> <address> <hostname> [client-id]`.
//! The DHCPv6 `duid` header line has fewer fields and is skipped.

use super::{entry_hostname, skip_entry, LeaseParser};
use chrono::DateTime;
use leasedns_core::lease::{KeyStrategy, Lease, Scope};
use leasedns_core::Result;
use std::net::IpAddr;
use std::path::Path;

/// Parser for dnsmasq's `dnsmasq.leases`
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsmasqParser;

impl LeaseParser for DnsmasqParser {
    fn name(&self) -> &'static str {
        "dnsmasq"
    }

    fn key_strategy(&self) -> KeyStrategy {
        KeyStrategy::Address
    }

    fn parse(&self, scope: &Scope, path: &Path, content: &str) -> Result<Vec<Lease>> {
        let mut leases = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            let entry = idx + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                continue;
            }

            let expiry = match fields[0].parse::<i64>() {
                // 0 is an infinite lease
                Ok(0) => None,
                Ok(secs) => match DateTime::from_timestamp(secs, 0) {
                    Some(expiry) => Some(expiry),
                    None => {
                        skip_entry(path, entry, format!("expiry out of range: {}", secs));
                        continue;
                    }
                },
                Err(e) => {
                    skip_entry(path, entry, format!("invalid expiry '{}': {}", fields[0], e));
                    continue;
                }
            };

            let address = match fields[2].parse::<IpAddr>() {
                Ok(address) => address,
                Err(e) => {
                    skip_entry(path, entry, format!("invalid address '{}': {}", fields[2], e));
                    continue;
                }
            };

            let Some(hostname) = entry_hostname(path, entry, fields[3]) else {
                continue;
            };

            leases.push(Lease::new(scope.clone(), hostname, address, expiry));
        }

        Ok(leases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Vec<Lease> {
        DnsmasqParser
            .parse(&Scope::new("dnsmasq.leases"), Path::new("dnsmasq.leases"), content)
            .unwrap()
    }

    #[test]
    fn test_parses_v4_and_v6_lines() {
        let leases = parse(
            "1700000000 aa:bb:cc:dd:ee:ff 192.168.1.10 laptop 01:aa:bb:cc:dd:ee:ff\n\
             duid 00:01:00:01:2c:1f:aa:bb:cc:dd:ee:ff\n\
             1700000100 123456 2001:DB8::10 Phone 00:01:00:01\n",
        );

        assert_eq!(leases.len(), 2);
        assert_eq!(leases[0].hostname, "laptop");
        assert_eq!(leases[0].address.to_string(), "192.168.1.10");
        assert_eq!(leases[0].expiry.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(leases[1].hostname, "phone");
        assert_eq!(leases[1].address.to_string(), "2001:db8::10");
    }

    #[test]
    fn test_zero_expiry_is_infinite() {
        let leases = parse("0 aa:bb:cc:dd:ee:ff 192.168.1.11 nas *\n0 aa:bb:cc:dd:ee:01 192.168.1.12 nas2 *\n");
        assert_eq!(leases.len(), 2);
        assert!(leases.iter().all(|lease| lease.expiry.is_none()));
    }

    #[test]
    fn test_star_hostname_is_ignored() {
        let leases = parse("1700000000 aa:bb:cc:dd:ee:ff 192.168.1.10 * *\n");
        assert!(leases.is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let leases = parse(
            "soon aa:bb:cc:dd:ee:ff 192.168.1.10 laptop *\n\
             1700000000 aa:bb:cc:dd:ee:ff 192.168.1.300 laptop *\n\
             1700000000 aa:bb:cc:dd:ee:ff 192.168.1.20 bad!name *\n\
             \n\
             1700000000 aa:bb:cc:dd:ee:ff 192.168.1.21 ok *\n",
        );
        assert_eq!(leases.len(), 1);
        assert_eq!(leases[0].hostname, "ok");
    }
}
