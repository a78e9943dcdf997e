//! Worker pool — starts workers on a shared feed and joins them on shutdown.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing;

use jobpool_core::config::worker::WorkerConfig;
use jobpool_core::error::AppError;
use jobpool_core::result::AppResult;
use jobpool_entity::job::Job;

use crate::context::WorkerContext;
use crate::feed::intake_feed;
use crate::worker::Worker;

/// Outcome of [`WorkerPool::try_dispatch`].
#[derive(Debug)]
pub enum Dispatch {
    /// The job was handed to the feed.
    Sent,
    /// The job's rank is at its in-flight limit; the job is handed back.
    Saturated(Job),
}

/// Fixed set of workers sharing one intake feed
#[derive(Debug)]
pub struct WorkerPool {
    /// Sending side of the feed; `None` once shutdown has begun
    sender: Option<mpsc::Sender<Job>>,
    /// Worker tasks
    workers: Vec<JoinHandle<()>>,
    /// Shared collaborators
    ctx: Arc<WorkerContext>,
    /// Pool configuration
    config: WorkerConfig,
}

impl WorkerPool {
    /// Validate `config` and spawn `config.concurrency` workers
    pub fn start(config: WorkerConfig, ctx: WorkerContext) -> AppResult<Self> {
        config.validate()?;

        let ctx = Arc::new(ctx);
        let (sender, feed) = intake_feed(config.queue_capacity);
        let workers = (0..config.concurrency)
            .map(|id| Worker::new(id, feed.clone(), Arc::clone(&ctx)).spawn())
            .collect();

        tracing::info!(
            "Worker pool started with concurrency={}, queue_capacity={}, topics={:?}",
            config.concurrency,
            config.queue_capacity,
            ctx.registry.topics()
        );

        Ok(Self {
            sender: Some(sender),
            workers,
            ctx,
            config,
        })
    }

    /// Shared collaborators of this pool
    pub fn context(&self) -> &Arc<WorkerContext> {
        &self.ctx
    }

    /// Number of worker tasks
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Count the job as in flight and hand it to the workers.
    ///
    /// Waits while the feed buffer is full.
    pub async fn dispatch(&self, job: Job) -> AppResult<()> {
        self.ctx.ledger.increment(job.rank);
        self.send(job).await
    }

    /// Like [`WorkerPool::dispatch`], but only if the job's rank is below
    /// its configured in-flight limit.
    pub async fn try_dispatch(&self, job: Job) -> AppResult<Dispatch> {
        let acquired = match self.config.rank_limit(job.rank) {
            Some(limit) => self.ctx.ledger.try_acquire(job.rank, limit),
            None => {
                self.ctx.ledger.increment(job.rank);
                true
            }
        };
        if !acquired {
            tracing::trace!("Rank {} saturated, holding job {}", job.rank, job.id);
            return Ok(Dispatch::Saturated(job));
        }

        self.send(job).await?;
        Ok(Dispatch::Sent)
    }

    async fn send(&self, job: Job) -> AppResult<()> {
        let rank = job.rank;
        let Some(sender) = &self.sender else {
            self.ctx.ledger.decrement(rank);
            return Err(AppError::closed("worker pool is shutting down"));
        };

        if let Err(e) = sender.send(job).await {
            self.ctx.ledger.decrement(rank);
            return Err(AppError::closed(format!(
                "intake feed closed, dropped job {}",
                e.0.id
            )));
        }
        Ok(())
    }

    /// Close the feed and wait for every worker to finish its current and
    /// buffered jobs
    pub async fn shutdown(mut self) {
        tracing::info!("Worker pool shutting down, waiting for in-flight jobs...");
        self.sender.take();

        for result in join_all(self.workers.drain(..)).await {
            if let Err(e) = result {
                tracing::error!("Worker task ended abnormally: {}", e);
            }
        }

        tracing::info!("Worker pool shut down complete");
    }
}
