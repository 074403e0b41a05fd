use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use leadflow::reconciler::{LeadReconciler, QueryFilter};
use leadflow::scheduler::SyncScheduler;

mod common;
use common::*;

async fn wait_for<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

fn shared_reconciler(store: Arc<TestStore>) -> Arc<Mutex<LeadReconciler>> {
    Arc::new(Mutex::new(LeadReconciler::with_store(test_config(), store)))
}

#[tokio::test]
async fn first_tick_loads_immediately() {
    let store = Arc::new(TestStore::with_rows(vec![sql_row(
        "L-1",
        "Tick Co",
        "Submitted",
        "AGENT_001",
    )]));
    let reconciler = shared_reconciler(store.clone());

    // Interval far beyond the test horizon: only the immediate first tick
    // can have loaded anything.
    let scheduler = SyncScheduler::start(reconciler.clone(), Duration::from_secs(3600));
    let probe = reconciler.clone();
    wait_for(move || {
        probe
            .try_lock()
            .map(|r| r.query(&QueryFilter::all()).total == 1)
            .unwrap_or(false)
    })
    .await;
    scheduler.stop().await;
}

#[tokio::test]
async fn force_sync_refreshes_without_waiting_for_the_interval() {
    let store = Arc::new(TestStore::with_rows(Vec::new()));
    let reconciler = shared_reconciler(store.clone());

    let scheduler = SyncScheduler::start(reconciler.clone(), Duration::from_secs(3600));
    let initial = store.clone();
    wait_for(move || initial.fetch_count() >= 1).await;

    // Upstream changed; don't wait an hour for the next tick.
    store.set_rows(vec![sql_row("L-F1", "Forced", "Submitted", "AGENT_001")]);
    scheduler.force_sync();

    let probe = reconciler.clone();
    wait_for(move || {
        probe
            .try_lock()
            .map(|r| r.query(&QueryFilter::all()).total == 1)
            .unwrap_or(false)
    })
    .await;
    scheduler.stop().await;
}

#[tokio::test]
async fn stop_shuts_the_loop_down() {
    let store = Arc::new(TestStore::with_rows(Vec::new()));
    let reconciler = shared_reconciler(store.clone());

    let scheduler = SyncScheduler::start(reconciler, Duration::from_millis(20));
    let ticking = store.clone();
    wait_for(move || ticking.fetch_count() >= 2).await;

    scheduler.stop().await;
    let after = store.fetch_count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.fetch_count(), after, "no syncs after stop");
}

#[tokio::test]
async fn manual_operations_interleave_with_the_scheduler() {
    let store = Arc::new(TestStore::with_rows(Vec::new()));
    let reconciler = shared_reconciler(store.clone());

    let scheduler = SyncScheduler::start(reconciler.clone(), Duration::from_millis(20));
    {
        let mut guard = reconciler.lock().await;
        guard
            .submit(leadflow::lead::LeadDraft {
                client: "Interleaved".to_string(),
                ..Default::default()
            })
            .await;
    }

    // The periodic sync re-reads the feed the submit wrote to; the lead
    // survives cache replacement because it reached the store.
    let probe = reconciler.clone();
    wait_for(move || {
        probe
            .try_lock()
            .map(|r| {
                let view = r.query(&QueryFilter::all());
                view.leads.iter().any(|l| l.client == "Interleaved")
            })
            .unwrap_or(false)
    })
    .await;
    scheduler.stop().await;
}
