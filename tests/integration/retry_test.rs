//! Integration tests for the retry and terminal-failure policy.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use jobpool_core::config::worker::WorkerConfig;
use jobpool_entity::job::{Job, JobState, RetryBackoff};
use jobpool_worker::{
    Clock, ConcurrencyLedger, HandlerRegistry, JobExecutionError, WorkerContext, WorkerPool,
    handler_fn,
};

use helpers::{BrokenStore, EPOCH, Signal, TestPool};

/// Register `topic` with a handler that fails `failures` times, then succeeds
fn register_failing(
    registry: &HandlerRegistry,
    topic: &str,
    failures: i32,
    calls: Arc<AtomicI32>,
) {
    registry.register(handler_fn(topic.to_string(), move |_job| {
        let calls = Arc::clone(&calls);
        async move {
            if calls.fetch_add(1, Ordering::SeqCst) < failures {
                Err(JobExecutionError::failed("remote error"))
            } else {
                Ok(())
            }
        }
    }));
}

#[tokio::test]
async fn test_job_recovers_before_retries_run_out() {
    let calls = Arc::new(AtomicI32::new(0));
    let counter = calls.clone();
    let app = TestPool::start(WorkerConfig::default(), move |registry| {
        register_failing(registry, "flaky", 2, counter)
    });

    let job = app.create(
        Job::new("flaky")
            .with_max_retry(3)
            .with_retry_wait(Duration::from_millis(100)),
    );

    app.run_eligible().await;
    let stored = app.store.get(job.id).unwrap();
    assert_eq!(stored.state, JobState::Waiting);
    assert_eq!(stored.retry, 1);
    assert_eq!(stored.after, EPOCH + 100_000_000);
    assert_eq!(stored.priority, -(EPOCH + 1_000_000_000));

    // Not eligible until the clock passes `after`.
    assert_eq!(app.run_eligible().await, 0);

    app.clock.advance(Duration::from_millis(100));
    app.run_eligible().await;
    assert_eq!(app.store.get(job.id).unwrap().retry, 2);

    app.clock.advance(Duration::from_millis(100));
    app.run_eligible().await;

    let stored = app.store.get(job.id).unwrap();
    assert_eq!(stored.state, JobState::Succeeded);
    assert_eq!(stored.retry, 2);
    assert_eq!(stored.completed, Some(EPOCH + 200_000_000));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        app.observer.for_job(job.id),
        vec![
            Signal::Started(job.id),
            Signal::Retry(job.id, 0, 3),
            Signal::Started(job.id),
            Signal::Retry(job.id, 1, 3),
            Signal::Started(job.id),
            Signal::Succeeded(job.id),
        ]
    );

    app.shutdown().await;
}

#[tokio::test]
async fn test_exhausted_job_fails_terminally() {
    let calls = Arc::new(AtomicI32::new(0));
    let counter = calls.clone();
    let app = TestPool::start(WorkerConfig::default(), move |registry| {
        register_failing(registry, "broken", i32::MAX, counter)
    });

    let job = app.create(Job::new("broken").with_max_retry(2));

    // Zero retry wait: every retry is immediately eligible again.
    app.run_eligible().await;

    let stored = app.store.get(job.id).unwrap();
    assert_eq!(stored.state, JobState::Failed);
    assert_eq!(stored.retry, 2);
    assert_eq!(stored.completed, Some(EPOCH));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        app.observer.for_job(job.id).last(),
        Some(&Signal::Failed(job.id))
    );

    // Terminal jobs are never handed out again.
    assert_eq!(app.run_eligible().await, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    app.shutdown().await;
}

#[tokio::test]
async fn test_exponential_waits_follow_pre_increment_retry() {
    let app = TestPool::start(WorkerConfig::default(), |registry| {
        register_failing(registry, "remote", i32::MAX, Arc::new(AtomicI32::new(0)))
    });

    let job = app.create(
        Job::new("remote")
            .with_max_retry(5)
            .with_backoff(RetryBackoff::Exponential)
            .with_retry_wait(Duration::from_nanos(1000)),
    );

    let mut waits = Vec::new();
    for _ in 0..4 {
        let now = app.clock.now_nanos();
        app.run_eligible().await;
        let stored = app.store.get(job.id).unwrap();
        waits.push(stored.after - now);
        app.clock.advance(Duration::from_nanos((stored.after - now) as u64));
    }

    assert_eq!(waits, vec![500, 1000, 2000, 4000]);
    assert_eq!(app.store.get(job.id).unwrap().retry, 4);

    app.shutdown().await;
}

#[tokio::test]
async fn test_store_failure_does_not_stop_worker() {
    let registry = Arc::new(HandlerRegistry::new());
    registry.register(handler_fn("ok", |_job| async { Ok(()) }));
    let store = Arc::new(BrokenStore::default());
    let ledger = Arc::new(ConcurrencyLedger::new());

    let ctx = WorkerContext::new(registry, store.clone()).with_ledger(ledger.clone());
    let config = WorkerConfig {
        concurrency: 1,
        ..WorkerConfig::default()
    };
    let pool = WorkerPool::start(config, ctx).unwrap();

    for _ in 0..3 {
        pool.dispatch(Job::new("ok").with_rank(4)).await.unwrap();
    }
    pool.shutdown().await;

    let attempts = store.attempts();
    assert_eq!(attempts.len(), 3);
    assert!(attempts.iter().all(|job| job.state == JobState::Succeeded));
    assert_eq!(ledger.in_flight(4), 0);
}
