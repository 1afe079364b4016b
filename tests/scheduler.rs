mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MemoryStore, ScriptedProber, check, site, with_site};
use uptime_backend::db::enums::CheckType;
use uptime_backend::monitor::{CheckRunner, DueQueue, MonitorScheduler, ProbeOutcome};

fn scheduler(store: Arc<MemoryStore>, prober: ScriptedProber) -> MonitorScheduler {
    let runner = Arc::new(CheckRunner::new(store, Arc::new(prober), 4));
    MonitorScheduler::new(runner, Duration::from_secs(1))
}

fn ok_prober() -> ScriptedProber {
    ScriptedProber::new([
        ("https://a.example.com", ProbeOutcome::Response { status_code: 200, latency_ms: 1 }),
        ("https://b.example.com", ProbeOutcome::Response { status_code: 200, latency_ms: 1 }),
    ])
}

#[tokio::test]
async fn back_to_back_ticks_run_a_check_once() {
    let a = site(1, "https://a.example.com");
    let store = Arc::new(MemoryStore::with_checks(vec![with_site(check(10, 1, CheckType::Http), &a)]));
    let scheduler = scheduler(store.clone(), ok_prober());
    let mut queue = DueQueue::new();

    let first = scheduler.tick_once(&mut queue).await.expect("new check is due");
    assert_eq!(first.summary.total, 1);
    assert_eq!(first.summary.recorded, 1);

    assert!(scheduler.tick_once(&mut queue).await.is_none());
    assert_eq!(store.runs().len(), 1);
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn every_new_check_runs_on_the_first_tick() {
    let a = site(1, "https://a.example.com");
    let b = site(2, "https://b.example.com");
    let store = Arc::new(MemoryStore::with_checks(vec![
        with_site(check(10, 1, CheckType::Http), &a),
        with_site(check(11, 2, CheckType::Https), &b),
        with_site(check(12, 2, CheckType::Tcp), &b),
    ]));
    let scheduler = scheduler(store.clone(), ok_prober());
    let mut queue = DueQueue::new();

    let report = scheduler.tick_once(&mut queue).await.unwrap();

    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.recorded, 2);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(store.runs().len(), 2);
}

#[tokio::test]
async fn load_failure_skips_the_tick() {
    let store = Arc::new(MemoryStore::default());
    store.fail_load();
    let scheduler = scheduler(store.clone(), ok_prober());
    let mut queue = DueQueue::new();

    assert!(scheduler.tick_once(&mut queue).await.is_none());
    assert!(queue.is_empty());
    assert!(store.runs().is_empty());
}

#[tokio::test]
async fn run_stops_on_shutdown() {
    let store = Arc::new(MemoryStore::default());
    let scheduler = scheduler(store, ok_prober());
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(());

    let handle = tokio::spawn(scheduler.run(shutdown_rx));
    shutdown_tx.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop")
        .unwrap();
}
