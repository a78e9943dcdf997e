//! Jobpool demo — runs a worker pool against the in-memory store.
//!
//! Loads configuration, initializes logging, registers a few handlers and
//! feeds waiting jobs to the pool until every job reaches a terminal state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use jobpool_core::config::AppConfig;
use jobpool_core::error::AppError;
use jobpool_entity::job::{CreateJob, JobState, RetryBackoff};
use jobpool_worker::{
    Clock, Dispatch, ExponentialBackoff, HandlerRegistry, JobExecutionError, MemoryJobStore,
    SystemClock, TracingObserver, WorkerContext, WorkerPool, handler_fn,
};

/// How often the feeder looks for newly eligible jobs
const FEED_INTERVAL: Duration = Duration::from_millis(20);

#[tokio::main]
async fn main() {
    let env = std::env::var("JOBPOOL_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Demo error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

fn register_handlers(registry: &HandlerRegistry) {
    registry.register(handler_fn("send-email", |job| async move {
        let to = job
            .args
            .get("to")
            .and_then(|to| to.as_str())
            .ok_or_else(|| AppError::validation("send-email job has no recipient"))?;
        tracing::info!("Sending email to {}", to);
        Ok(())
    }));

    let calls = Arc::new(AtomicU32::new(0));
    registry.register(handler_fn("flaky", move |job| {
        let calls = Arc::clone(&calls);
        async move {
            if calls.fetch_add(1, Ordering::SeqCst) % 3 == 2 {
                Ok(())
            } else {
                Err(JobExecutionError::failed(format!(
                    "upstream unavailable (try {})",
                    job.retry + 1
                )))
            }
        }
    }));

    registry.register(handler_fn("broken", |_job| async {
        Err(JobExecutionError::failed("always fails"))
    }));
}

fn seed_jobs(store: &MemoryJobStore) -> Result<(), AppError> {
    let requests = [
        CreateJob {
            topic: "send-email".to_string(),
            args: serde_json::json!({"to": "ops@example.com"}),
            ..CreateJob::default()
        },
        CreateJob {
            topic: "flaky".to_string(),
            rank: 1,
            max_retry: 4,
            retry_backoff: RetryBackoff::Exponential,
            retry_wait_ms: 50,
            ..CreateJob::default()
        },
        CreateJob {
            topic: "broken".to_string(),
            max_retry: 2,
            retry_wait_ms: 30,
            ..CreateJob::default()
        },
    ];

    for request in requests {
        store.create(request.into_job()?)?;
    }
    Ok(())
}

/// Feed eligible jobs to the pool until nothing is left to run
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting jobpool demo v{}", env!("CARGO_PKG_VERSION"));

    let registry = Arc::new(HandlerRegistry::new());
    register_handlers(&registry);

    let store = Arc::new(MemoryJobStore::new());
    seed_jobs(&store)?;

    let clock = SystemClock;
    let ctx = WorkerContext::new(registry, store.clone())
        .with_backoff(Arc::new(ExponentialBackoff::from_config(&config.backoff)))
        .with_observer(Arc::new(TracingObserver));
    let pool = WorkerPool::start(config.worker.clone(), ctx)?;

    // Never stored, so the resolution error only shows up in the logs.
    let orphan = CreateJob {
        topic: "unregistered".to_string(),
        ..CreateJob::default()
    }
    .into_job()?;
    pool.dispatch(orphan).await?;

    loop {
        while let Some(job) = store.claim_next(clock.now_nanos()) {
            if let Dispatch::Saturated(job) = pool.try_dispatch(job).await? {
                store.release(job.id);
                break;
            }
        }

        if store.count_by_state(JobState::Waiting) == 0 && store.claimed_count() == 0 {
            break;
        }
        tokio::time::sleep(FEED_INTERVAL).await;
    }

    pool.shutdown().await;

    tracing::info!(
        "Demo finished: succeeded={}, failed={}, waiting={}",
        store.count_by_state(JobState::Succeeded),
        store.count_by_state(JobState::Failed),
        store.count_by_state(JobState::Waiting)
    );
    Ok(())
}
