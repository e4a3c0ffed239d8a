//! Contract Test: Reconciliation Semantics
//!
//! This test drives the engine one scope pass at a time and verifies the
//! record operations handed to the sink.
//!
//! Constraints verified:
//! - A new lease adds its PTR and forward record; a moved lease replaces them
//! - A vanished scope removes everything it held
//! - Re-running an unchanged snapshot emits nothing
//! - Expired leases are removed even if still present in the source
//! - Duplicate keys resolve to the latest-expiring entry
//! - Passes over one scope never touch another scope's records

mod common;

use chrono::{Duration, Utc};
use common::*;
use leasedns_core::lease::{KeyStrategy, Scope};
use leasedns_core::LeaseEngine;

fn engine(strategy: KeyStrategy) -> (LeaseEngine, SourceHandle, RecordingSink) {
    let (source, handle) = ScriptedSource::new(strategy);
    let sink = RecordingSink::new();
    let (engine, _events) =
        LeaseEngine::new(Box::new(source), Box::new(sink.clone()), poll_config(1_000))
            .expect("engine construction succeeds");
    (engine, handle, sink)
}

#[tokio::test]
async fn printer_moves_then_disappears() {
    let (mut engine, source, sink) = engine(KeyStrategy::Hostname);
    let scope = Scope::new("leases");

    // Cycle 1: new lease
    source.set_scope("leases", vec![lease("leases", "printer", "192.0.2.5", None)]);
    engine.sync_scope(&scope).await;

    // Cycle 2: address changed
    source.set_scope("leases", vec![lease("leases", "printer", "192.0.2.9", None)]);
    engine.sync_scope(&scope).await;

    // Cycle 3: file deleted
    source.delete_scope("leases");
    engine.sync_scope(&scope).await;

    let calls = sink.calls();
    assert_eq!(calls.len(), 3);

    assert!(calls[0].removed.is_empty());
    assert_eq!(
        calls[0].added,
        vec![
            "5.2.0.192.in-addr.arpa IN PTR printer.lan",
            "printer.lan IN A 192.0.2.5",
        ]
    );

    assert_eq!(calls[1].removed, calls[0].added);
    assert_eq!(
        calls[1].added,
        vec![
            "9.2.0.192.in-addr.arpa IN PTR printer.lan",
            "printer.lan IN A 192.0.2.9",
        ]
    );

    assert_eq!(calls[2].removed, calls[1].added);
    assert!(calls[2].added.is_empty());
    assert!(engine.cache().keys_in_scope(&scope).is_empty());
}

#[tokio::test]
async fn unchanged_snapshot_is_idempotent() {
    let (mut engine, source, sink) = engine(KeyStrategy::Address);
    let scope = Scope::new("dhcp4.leases");

    source.set_scope(
        "dhcp4.leases",
        vec![
            lease("dhcp4.leases", "laptop", "10.0.0.20", Some(3600)),
            lease("dhcp4.leases", "phone", "2001:db8::20", Some(3600)),
        ],
    );

    let first = engine.sync_scope(&scope).await;
    let second = engine.sync_scope(&scope).await;

    assert_eq!(first.added.len(), 4);
    assert!(!second.changed(), "second pass emitted {:?}", second);
    assert_eq!(sink.call_count(), 1, "unchanged pass must not call the sink");
}

#[tokio::test]
async fn expired_lease_is_removed_while_still_in_source() {
    let (mut engine, source, sink) = engine(KeyStrategy::Address);
    let scope = Scope::new("dnsmasq.leases");

    source.set_scope(
        "dnsmasq.leases",
        vec![lease("dnsmasq.leases", "tablet", "10.0.0.30", Some(60))],
    );
    engine.sync_scope(&scope).await;
    assert_eq!(engine.cache().len(), 1);

    // Evaluate two minutes later: the line is still in the file but expired
    let later = Utc::now() + Duration::seconds(120);
    let delta = engine.sync_scope_at(&scope, later).await;

    assert!(delta.added.is_empty());
    assert_eq!(
        sink.calls()[1].removed,
        vec![
            "30.0.0.10.in-addr.arpa IN PTR tablet.lan",
            "tablet.lan IN A 10.0.0.30",
        ]
    );
    assert!(engine.cache().is_empty());
}

#[tokio::test]
async fn already_expired_lease_is_never_added() {
    let (mut engine, source, sink) = engine(KeyStrategy::Address);
    let scope = Scope::new("kea");

    source.set_scope("kea", vec![lease("kea", "ghost", "10.0.0.99", Some(-10))]);
    let delta = engine.sync_scope(&scope).await;

    assert!(!delta.changed());
    assert_eq!(sink.call_count(), 0);
}

#[tokio::test]
async fn latest_expiry_wins_for_duplicate_key() {
    let (mut engine, source, sink) = engine(KeyStrategy::Hostname);
    let scope = Scope::new("eth0.json");

    source.set_scope(
        "eth0.json",
        vec![
            lease("eth0.json", "phone", "2001:db8::2", Some(7200)),
            lease("eth0.json", "phone", "2001:db8::1", Some(600)),
        ],
    );
    engine.sync_scope(&scope).await;

    let calls = sink.calls();
    assert_eq!(calls[0].added.len(), 2);
    assert_eq!(calls[0].added[1], "phone.lan IN AAAA 2001:db8::2");
}

#[tokio::test]
async fn scopes_are_isolated() {
    let (mut engine, source, sink) = engine(KeyStrategy::Hostname);
    let eth0 = Scope::new("eth0.json");
    let eth1 = Scope::new("eth1.json");

    source.set_scope("eth0.json", vec![lease("eth0.json", "tv", "fd00::10", None)]);
    source.set_scope("eth1.json", vec![lease("eth1.json", "nas", "fd01::20", None)]);
    engine.sync_scope(&eth0).await;
    engine.sync_scope(&eth1).await;

    // Mutate eth0, then delete it entirely
    source.set_scope("eth0.json", vec![lease("eth0.json", "tv", "fd00::11", None)]);
    engine.sync_scope(&eth0).await;
    engine.remove_scope(&eth0).await;

    for call in &sink.calls()[2..] {
        for line in call.removed.iter().chain(call.added.iter()) {
            assert!(!line.contains("nas"), "eth1 record touched: {}", line);
        }
    }
    assert!(engine.cache().keys_in_scope(&eth0).is_empty());
    assert_eq!(engine.cache().keys_in_scope(&eth1).len(), 1);
}
