// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::config::GateConfig;
use crate::error::VoiceError;
use crate::protocol::gate::*;
use crate::protocol::registry::GateRegistry;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

fn gate(capacity: usize, default_hold: Duration) -> Arc<ConcurrencyGate> {
    Arc::new(ConcurrencyGate::with_default_hold(42, capacity, default_hold).unwrap())
}

#[test]
fn test_zero_capacity_rejected() {
    assert!(ConcurrencyGate::new(1, 0).is_err());
}

#[test]
fn test_gate_requires_runtime() {
    match ConcurrencyGate::new(1, 1) {
        Err(VoiceError::ConfigError(msg)) => assert!(msg.contains("Tokio runtime")),
        other => panic!("Expected ConfigError, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_third_acquire_waits_for_release() {
    let gate = gate(2, DEFAULT_HOLD);

    gate.acquire().await.unwrap();
    gate.acquire().await.unwrap();
    assert_eq!(gate.available(), 0);

    let start = Instant::now();
    let waiter = {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move { gate.acquire().await })
    };
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    gate.extend_release(Duration::from_secs(2)).expect("a hold to extend");
    waiter.await.unwrap().unwrap();

    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(2));
    assert!(waited < DEFAULT_HOLD);
    assert_eq!(gate.available(), 0);
    assert_eq!(gate.outstanding(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_default_hold_returns_permit() {
    let gate = gate(1, Duration::from_millis(500));
    let start = Instant::now();

    gate.acquire().await.unwrap();
    assert_eq!(gate.available(), 0);

    // Only the default hold timer can free this permit.
    gate.acquire().await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(500));

    let snapshot = gate.metrics().snapshot();
    assert_eq!(snapshot.auto_releases, 1);
    assert_eq!(snapshot.gate_acquisitions, 2);
    assert_eq!(snapshot.gate_contended, 1);
}

#[tokio::test(start_paused = true)]
async fn test_extend_longer_than_default() {
    let gate = gate(1, Duration::from_secs(1));
    let start = Instant::now();

    gate.acquire().await.unwrap();
    gate.extend_release(Duration::from_secs(5)).unwrap();

    sleep(Duration::from_secs(2)).await;
    assert_eq!(gate.available(), 0, "default hold must not fire after an extend");

    gate.wait_only().await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert_eq!(gate.available(), 1);

    let snapshot = gate.metrics().snapshot();
    assert_eq!(snapshot.auto_releases, 0);
    assert_eq!(snapshot.custom_releases, 1);
}

#[tokio::test(start_paused = true)]
async fn test_extend_shorter_than_default() {
    let gate = gate(1, DEFAULT_HOLD);
    let start = Instant::now();

    gate.acquire().await.unwrap();
    gate.extend_release(Duration::from_millis(100)).unwrap();
    gate.wait_only().await.unwrap();

    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(100));
    assert!(waited < DEFAULT_HOLD);
}

#[tokio::test(start_paused = true)]
async fn test_extend_with_nothing_held_is_noop() {
    let gate = gate(2, Duration::from_millis(100));

    assert!(gate.extend_release(Duration::from_secs(1)).is_none());
    assert_eq!(gate.available(), 2);
    assert_eq!(gate.outstanding(), 0);
    assert_eq!(gate.metrics().snapshot().spurious_extensions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_extend_after_expiry_does_not_over_credit() {
    let gate = gate(1, Duration::from_millis(100));

    gate.acquire().await.unwrap();
    sleep(Duration::from_millis(200)).await;
    assert_eq!(gate.available(), 1);

    assert!(gate.extend_release(Duration::from_millis(10)).is_none());
    sleep(Duration::from_millis(50)).await;
    assert_eq!(gate.available(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_extend_targets_oldest_default_hold() {
    let gate = gate(2, Duration::from_secs(10));

    let first = gate.acquire().await.unwrap();
    let second = gate.acquire().await.unwrap();

    let extended = gate.extend_release(Duration::from_secs(1)).unwrap();
    assert_ne!(extended, first);
    assert!(gate.extend_hold(first, Duration::from_secs(1)).is_none());
    assert!(gate.extend_hold(second, Duration::from_secs(1)).is_some());
    assert_eq!(gate.outstanding(), 2);

    sleep(Duration::from_millis(1100)).await;
    assert_eq!(gate.available(), 2);
    assert_eq!(gate.outstanding(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_extend_rearms_single_timer() {
    let gate = gate(1, Duration::from_secs(10));

    gate.acquire().await.unwrap();
    gate.extend_release(Duration::from_secs(1)).unwrap();
    gate.extend_release(Duration::from_secs(3)).unwrap();
    assert_eq!(gate.outstanding(), 1);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(gate.available(), 0, "replaced timer must not release");

    sleep(Duration::from_secs(2)).await;
    assert_eq!(gate.available(), 1);
    assert_eq!(gate.metrics().snapshot().custom_releases, 1);
}

#[tokio::test(start_paused = true)]
async fn test_ready_release_uses_cooldown_without_server_delay() {
    let gate = Arc::new(
        ConcurrencyGate::with_default_hold(42, 1, DEFAULT_HOLD)
            .unwrap()
            .with_ready_cooldown(Duration::from_secs(3)),
    );
    let start = Instant::now();

    gate.acquire().await.unwrap();
    gate.release_after_ready(None).unwrap();
    gate.wait_only().await.unwrap();
    let waited = start.elapsed();
    assert!(waited >= Duration::from_secs(3));
    assert!(waited < Duration::from_secs(4));

    let start = Instant::now();
    gate.acquire().await.unwrap();
    gate.release_after_ready(Some(Duration::from_millis(250))).unwrap();
    gate.wait_only().await.unwrap();
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(250));
    assert!(waited < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_default_ready_cooldown() {
    let gate = gate(1, DEFAULT_HOLD);
    assert_eq!(gate.ready_cooldown(), DEFAULT_READY_COOLDOWN);

    let start = Instant::now();
    gate.acquire().await.unwrap();
    gate.release_after_ready(None).unwrap();
    gate.wait_only().await.unwrap();
    assert!(start.elapsed() >= DEFAULT_READY_COOLDOWN);
    assert!(start.elapsed() < DEFAULT_HOLD);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_keeps_permit() {
    let gate = gate(1, Duration::from_millis(100));

    gate.acquire().await.unwrap();
    gate.dispose();
    gate.dispose();
    assert_eq!(gate.outstanding(), 0);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(gate.available(), 0);

    let blocked = timeout(Duration::from_secs(10), gate.acquire()).await;
    assert!(blocked.is_err(), "acquire beyond remaining capacity must block");
    assert_eq!(gate.metrics().snapshot().disposed_holds, 1);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_leaves_free_permits_usable() {
    let gate = gate(2, Duration::from_millis(100));

    gate.acquire().await.unwrap();
    gate.dispose();
    assert_eq!(gate.available(), 1);

    gate.acquire().await.unwrap();
    assert_eq!(gate.available(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_wait_only_does_not_claim() {
    let gate = gate(1, Duration::from_millis(100));

    gate.wait_only().await.unwrap();
    assert_eq!(gate.available(), 1);
    assert_eq!(gate.outstanding(), 0);

    gate.acquire().await.unwrap();
    let start = Instant::now();
    gate.wait_only().await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(gate.available(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_waiters_served_in_arrival_order() {
    let gate = gate(1, Duration::from_millis(100));
    let order = Arc::new(Mutex::new(Vec::new()));

    gate.acquire().await.unwrap();

    let mut waiters = Vec::new();
    for n in 0..3u32 {
        let gate = Arc::clone(&gate);
        let order = Arc::clone(&order);
        waiters.push(tokio::spawn(async move {
            gate.acquire().await.unwrap();
            order.lock().unwrap().push(n);
        }));
        tokio::task::yield_now().await;
    }

    for waiter in waiters {
        waiter.await.unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_registry_shares_gate_per_owner() {
    let registry = GateRegistry::new(Duration::from_millis(100));

    let a = registry.get_or_create(7, 2).unwrap();
    let b = registry.get_or_create(7, 5).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(b.capacity(), 2);

    let other = registry.get_or_create(8, 1).unwrap();
    assert!(!Arc::ptr_eq(&a, &other));
    assert_eq!(registry.len(), 2);

    a.acquire().await.unwrap();
    other.acquire().await.unwrap();
    assert_eq!(registry.metrics().snapshot().gate_acquisitions, 2);
}

#[tokio::test(start_paused = true)]
async fn test_registry_remove_disposes() {
    let registry = GateRegistry::new(Duration::from_millis(100));
    let gate = registry.get_or_create(7, 1).unwrap();
    gate.acquire().await.unwrap();

    let removed = registry.remove(7).unwrap();
    assert!(Arc::ptr_eq(&gate, &removed));
    assert!(registry.get(7).is_none());
    assert!(registry.is_empty());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(gate.available(), 0);
}

#[test]
fn test_registry_rejects_zero_capacity() {
    let registry = GateRegistry::default();
    assert!(registry.get_or_create(1, 0).is_err());
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_registry_applies_gate_config() {
    let config = GateConfig {
        default_hold: Duration::from_secs(20),
        max_concurrency: 3,
        ready_cooldown: Duration::from_secs(2),
    };
    let registry = GateRegistry::from_config(&config);
    assert_eq!(registry.fallback_capacity(), 3);

    let unreported = registry.get_or_create_reported(1, None).unwrap();
    assert_eq!(unreported.capacity(), 3);
    assert_eq!(unreported.default_hold(), Duration::from_secs(20));
    assert_eq!(unreported.ready_cooldown(), Duration::from_secs(2));

    let reported = registry.get_or_create_reported(2, Some(5)).unwrap();
    assert_eq!(reported.capacity(), 5);

    let start = Instant::now();
    unreported.acquire().await.unwrap();
    unreported.release_after_ready(None).unwrap();
    sleep(Duration::from_millis(2100)).await;
    assert_eq!(unreported.available(), 3);
    assert!(start.elapsed() < Duration::from_secs(20));
}
