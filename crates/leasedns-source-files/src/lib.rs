// # File Lease Sources
//
// This crate provides the file/directory backed lease sources:
//
// | Type       | Format                                   | Keyed by  |
// |------------|------------------------------------------|-----------|
// | `dnsmasq`  | `dnsmasq.leases` whitespace lines        | address   |
// | `kea`      | Kea memfile CSV                          | address   |
// | `networkd` | systemd-networkd JSON (`Leases` array)   | address   |
// | `slaac`    | SLAAC resolver JSON array, `*.json` only | hostname  |
//
// ## Change Notifications
//
// `watch()` uses the platform's recommended `notify` backend (inotify on
// Linux, kqueue on the BSDs).

mod parser;
mod source;
mod watch;

pub use parser::{DnsmasqParser, KeaParser, LeaseParser, NetworkdParser, SlaacParser};
pub use source::FileLeaseSource;

use leasedns_core::config::SourceConfig;
use leasedns_core::traits::{LeaseSource, LeaseSourceFactory};
use leasedns_core::{Error, Registry, Result};
use std::sync::Arc;

/// Factory for one file format
pub struct FileSourceFactory {
    parser: Arc<dyn LeaseParser>,
}

impl FileSourceFactory {
    pub fn new(parser: Arc<dyn LeaseParser>) -> Self {
        Self { parser }
    }
}

impl LeaseSourceFactory for FileSourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn LeaseSource>> {
        if config.type_name() != self.parser.name() {
            return Err(Error::config(format!(
                "Invalid config for {} lease source: got '{}'",
                self.parser.name(),
                config.type_name()
            )));
        }
        let path = config.path().ok_or_else(|| {
            Error::config(format!("{} lease source requires a path", self.parser.name()))
        })?;

        Ok(Box::new(FileLeaseSource::new(path, Arc::clone(&self.parser))))
    }
}

/// Register all file lease sources with the registry
pub fn register(registry: &Registry) {
    let parsers: [Arc<dyn LeaseParser>; 4] = [
        Arc::new(DnsmasqParser),
        Arc::new(KeaParser),
        Arc::new(NetworkdParser),
        Arc::new(SlaacParser),
    ];
    for parser in parsers {
        registry.register_source(parser.name(), Box::new(FileSourceFactory::new(parser)));
    }
}
