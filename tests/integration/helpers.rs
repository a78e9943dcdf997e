//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use jobpool_core::config::worker::WorkerConfig;
use jobpool_core::error::AppError;
use jobpool_core::result::AppResult;
use jobpool_entity::job::Job;
use jobpool_worker::{
    Clock, ConcurrencyLedger, Dispatch, HandlerRegistry, JobObserver, JobStore, MemoryJobStore,
    WorkerContext, WorkerPool,
};

/// Start of the manual clock, in nanoseconds since the epoch
pub const EPOCH: i64 = 1_700_000_000_000_000_000;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self(AtomicI64::new(start))
    }

    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.as_nanos() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle signal captured by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Started(Uuid),
    Succeeded(Uuid),
    Failed(Uuid),
    Retry(Uuid, i32, i32),
}

/// Observer that keeps every signal in order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    signals: Mutex<Vec<Signal>>,
}

impl RecordingObserver {
    pub fn signals(&self) -> Vec<Signal> {
        self.signals.lock().unwrap().clone()
    }

    pub fn for_job(&self, id: Uuid) -> Vec<Signal> {
        self.signals()
            .into_iter()
            .filter(|signal| match signal {
                Signal::Started(s)
                | Signal::Succeeded(s)
                | Signal::Failed(s)
                | Signal::Retry(s, _, _) => *s == id,
            })
            .collect()
    }

    fn push(&self, signal: Signal) {
        self.signals.lock().unwrap().push(signal);
    }
}

impl JobObserver for RecordingObserver {
    fn job_started(&self, job: &Job) {
        self.push(Signal::Started(job.id));
    }

    fn job_succeeded(&self, job: &Job) {
        self.push(Signal::Succeeded(job.id));
    }

    fn job_failed(&self, job: &Job) {
        self.push(Signal::Failed(job.id));
    }

    fn job_retry(&self, job: &Job, retry: i32, max_retry: i32) {
        self.push(Signal::Retry(job.id, retry, max_retry));
    }
}

/// Store whose updates always fail, counting the attempts
#[derive(Debug, Default)]
pub struct BrokenStore {
    attempts: Mutex<Vec<Job>>,
}

impl BrokenStore {
    pub fn attempts(&self) -> Vec<Job> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobStore for BrokenStore {
    async fn update(&self, job: &Job) -> AppResult<()> {
        self.attempts.lock().unwrap().push(job.clone());
        Err(AppError::store("connection reset"))
    }
}

/// Worker pool wired to an in-memory store, a manual clock and a
/// recording observer
pub struct TestPool {
    pub pool: WorkerPool,
    pub store: Arc<MemoryJobStore>,
    pub registry: Arc<HandlerRegistry>,
    pub observer: Arc<RecordingObserver>,
    pub ledger: Arc<ConcurrencyLedger>,
    pub clock: Arc<ManualClock>,
}

impl TestPool {
    /// Start a pool; `register` installs the handlers under test
    pub fn start(config: WorkerConfig, register: impl FnOnce(&HandlerRegistry)) -> Self {
        let registry = Arc::new(HandlerRegistry::new());
        register(registry.as_ref());

        let store = Arc::new(MemoryJobStore::new());
        let observer = Arc::new(RecordingObserver::default());
        let ledger = Arc::new(ConcurrencyLedger::new());
        let clock = Arc::new(ManualClock::new(EPOCH));

        let ctx = WorkerContext::new(registry.clone(), store.clone())
            .with_ledger(ledger.clone())
            .with_observer(observer.clone())
            .with_clock(clock.clone())
            .with_backoff(Arc::new(|retry: i32| Duration::from_secs(retry as u64 + 1)));

        let pool = WorkerPool::start(config, ctx).expect("Failed to start worker pool");

        Self {
            pool,
            store,
            registry,
            observer,
            ledger,
            clock,
        }
    }

    /// Store a job, eligible at the current manual time, and return it
    pub fn create(&self, mut job: Job) -> Job {
        job.after = self.clock.now_nanos();
        self.store.create(job).expect("Failed to store job")
    }

    /// Dispatch eligible jobs round by round, waiting for each round to be
    /// handed back to the store, until a round finds nothing to send
    pub async fn run_eligible(&self) -> usize {
        let mut dispatched = 0;
        loop {
            let mut sent = 0;
            while let Some(job) = self.store.claim_next(self.clock.now_nanos()) {
                match self.pool.try_dispatch(job).await.expect("dispatch failed") {
                    Dispatch::Sent => sent += 1,
                    Dispatch::Saturated(job) => {
                        self.store.release(job.id);
                        break;
                    }
                }
            }
            self.settle().await;
            if sent == 0 {
                return dispatched;
            }
            dispatched += sent;
        }
    }

    /// Wait until no claimed job is outstanding
    pub async fn settle(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.store.claimed_count() > 0 {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("jobs did not settle");
    }

    /// Close the feed, join the workers and keep what tests inspect
    pub async fn shutdown(self) -> Finished {
        self.pool.shutdown().await;
        Finished {
            store: self.store,
            observer: self.observer,
            ledger: self.ledger,
        }
    }
}

/// State left behind by a [`TestPool`] after shutdown
pub struct Finished {
    pub store: Arc<MemoryJobStore>,
    pub observer: Arc<RecordingObserver>,
    pub ledger: Arc<ConcurrencyLedger>,
}
