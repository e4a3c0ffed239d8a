//! Core traits for the lease reconciliation system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`LeaseSource`]: Read lease snapshots and report scope changes
//! - [`RecordSink`]: Apply record batches to the resolver

pub mod lease_source;
pub mod record_sink;

pub use lease_source::{LeaseSource, LeaseSourceFactory, ScopeEvent, ScopeEventStream};
pub use record_sink::{RecordSink, RecordSinkFactory};
