//! Contract Test: Startup and Shutdown Determinism
//!
//! Constraints verified:
//! - Engine terminates on shutdown signal and reports why it stopped
//! - Dropping the shutdown sender also stops the engine
//! - A source that cannot be listed at startup is fatal, before any sink call
//! - The poll loop picks up new scopes and scopes whose file vanished
//! - Shutdown lets an in-flight sink call finish before the engine stops

mod common;

use common::*;
use leasedns_core::lease::{KeyStrategy, Scope};
use leasedns_core::{EngineEvent, Error, LeaseEngine};
use std::time::Duration;
use tokio::sync::oneshot;

#[tokio::test]
async fn shutdown_signal_terminates_engine() {
    let (source, _handle) = ScriptedSource::new(KeyStrategy::Address);
    let (mut engine, mut events) =
        LeaseEngine::new(Box::new(source), Box::new(RecordingSink::new()), poll_config(50))
            .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(async move { engine.run_with_shutdown(shutdown_rx).await });

    wait_for(&mut events, |e| matches!(e, EngineEvent::Started { .. })).await;
    shutdown_tx.send(()).expect("engine still running");

    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("Engine should terminate within 5 seconds")
        .expect("engine task completes");
    tokio_test::assert_ok!(result);

    let stopped = wait_for(&mut events, |e| matches!(e, EngineEvent::Stopped { .. })).await;
    assert_eq!(
        stopped,
        EngineEvent::Stopped {
            reason: "Shutdown signal".to_string()
        }
    );
}

#[tokio::test]
async fn dropped_shutdown_sender_stops_engine() {
    let (source, _handle) = ScriptedSource::new(KeyStrategy::Address);
    let (mut engine, _events) =
        LeaseEngine::new(Box::new(source), Box::new(RecordingSink::new()), watch_config())
            .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    drop(shutdown_tx);

    let result = tokio::time::timeout(Duration::from_secs(5), engine.run_with_shutdown(shutdown_rx))
        .await
        .expect("Engine should terminate within 5 seconds");
    tokio_test::assert_ok!(result);
}

#[tokio::test]
async fn unavailable_source_at_startup_is_fatal() {
    let (source, handle) = ScriptedSource::new(KeyStrategy::Address);
    let sink = RecordingSink::new();
    handle.set_scope("dnsmasq.leases", vec![lease("dnsmasq.leases", "pc", "10.0.0.2", None)]);
    handle.set_available(false);

    let (mut engine, mut events) =
        LeaseEngine::new(Box::new(source), Box::new(sink.clone()), poll_config(50))
            .expect("engine construction succeeds");

    let (_shutdown_tx, shutdown_rx) = oneshot::channel();
    let result = engine.run_with_shutdown(shutdown_rx).await;

    assert!(matches!(result, Err(Error::SourcePath { .. })), "got {:?}", result);
    assert_eq!(sink.call_count(), 0);
    assert!(events.try_recv().is_err(), "no event before a failed start");
}

#[tokio::test]
async fn poll_loop_follows_scope_lifecycle() {
    let (source, handle) = ScriptedSource::new(KeyStrategy::Address);
    let sink = RecordingSink::new();

    let (mut engine, mut events) =
        LeaseEngine::new(Box::new(source), Box::new(sink.clone()), poll_config(20))
            .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        let result = engine.run_with_shutdown(shutdown_rx).await;
        (engine, result)
    });

    let started = wait_for(&mut events, |e| matches!(e, EngineEvent::Started { .. })).await;
    assert_eq!(started, EngineEvent::Started { scopes_count: 0 });

    handle.set_scope("kea-leases4.csv", vec![lease("kea-leases4.csv", "pc", "10.0.0.2", None)]);
    let added = wait_for(&mut events, |e| matches!(e, EngineEvent::ScopeReconciled { .. })).await;
    assert_eq!(
        added,
        EngineEvent::ScopeReconciled {
            scope: Scope::new("kea-leases4.csv"),
            added: 2,
            removed: 0,
        }
    );

    // The file goes away; the cached scope is still visited and emptied
    handle.delete_scope("kea-leases4.csv");
    let removed = wait_for(&mut events, |e| matches!(e, EngineEvent::ScopeReconciled { .. })).await;
    assert_eq!(
        removed,
        EngineEvent::ScopeReconciled {
            scope: Scope::new("kea-leases4.csv"),
            added: 0,
            removed: 2,
        }
    );

    shutdown_tx.send(()).expect("engine still running");
    let (engine, result) = task.await.expect("engine task completes");
    tokio_test::assert_ok!(result);
    assert!(engine.cache().is_empty());
    assert_eq!(sink.call_count(), 2);
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_sink_call() {
    let (source, handle) = ScriptedSource::new(KeyStrategy::Address);
    let sink = SlowSink::new(Duration::from_millis(300));

    let (mut engine, mut events) =
        LeaseEngine::new(Box::new(source), Box::new(sink.clone()), poll_config(20))
            .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        let result = engine.run_with_shutdown(shutdown_rx).await;
        (engine, result)
    });

    wait_for(&mut events, |e| matches!(e, EngineEvent::Started { .. })).await;
    handle.set_scope("dnsmasq.leases", vec![lease("dnsmasq.leases", "pc", "10.0.0.2", None)]);

    tokio::time::timeout(Duration::from_secs(5), sink.wait_started())
        .await
        .expect("sink call should start within 5 seconds");
    assert_eq!(sink.completed(), 0);
    shutdown_tx.send(()).expect("engine still running");

    let (engine, result) = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("Engine should terminate within 5 seconds")
        .expect("engine task completes");
    tokio_test::assert_ok!(result);

    assert_eq!(sink.completed(), 1, "in-flight sink call must not be cancelled");
    assert_eq!(engine.cache().len(), 1);
    let reconciled = wait_for(&mut events, |e| matches!(e, EngineEvent::ScopeReconciled { .. })).await;
    assert_eq!(
        reconciled,
        EngineEvent::ScopeReconciled {
            scope: Scope::new("dnsmasq.leases"),
            added: 2,
            removed: 0,
        }
    );
}
