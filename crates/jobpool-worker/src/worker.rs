//! Worker — consumes jobs from the intake feed and applies the retry policy.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing;

use jobpool_core::result::AppResult;
use jobpool_entity::job::Job;

use crate::context::WorkerContext;
use crate::feed::IntakeFeed;

/// A single sequential consumer of the intake feed.
///
/// The store only sees a job again when an attempt ends in `update`. If the
/// process dies mid-attempt the job is still `Waiting` in the store and will
/// be delivered again, so handlers must tolerate at-least-once execution.
#[derive(Debug)]
pub struct Worker {
    /// Worker index within its pool
    id: usize,
    /// Shared intake feed
    feed: IntakeFeed,
    /// Shared collaborators
    ctx: Arc<WorkerContext>,
}

impl Worker {
    /// Create a worker bound to a feed and context
    pub fn new(id: usize, feed: IntakeFeed, ctx: Arc<WorkerContext>) -> Self {
        Self { id, feed, ctx }
    }

    /// Worker index within its pool
    pub fn id(&self) -> usize {
        self.id
    }

    /// Run the worker on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process jobs until the feed is closed and drained
    pub async fn run(self) {
        tracing::debug!("Worker {} started", self.id);

        while let Some(mut job) = self.feed.next().await {
            if let Err(e) = self.process(&mut job).await {
                tracing::error!(job_id = %job.id, "Job {} failed: {}", job.id, e);
            }
        }

        tracing::debug!("Worker {} stopped", self.id);
    }

    /// Run one attempt of `job` and record its outcome.
    ///
    /// The in-flight count for the job's rank is released on every return
    /// path. A missing handler leaves the job untouched and unpersisted.
    /// Store errors are returned after the job has already been mutated.
    pub async fn process(&self, job: &mut Job) -> AppResult<()> {
        let _in_flight = self.ctx.ledger.guard(job.rank);

        let handler = self.ctx.registry.resolve(&job.topic)?;

        self.ctx.observer.job_started(job);

        let Err(err) = handler.execute(job).await else {
            job.succeed(self.ctx.clock.now_nanos());
            self.ctx.store.update(job).await?;
            self.ctx.observer.job_succeeded(job);
            return Ok(());
        };

        if job.retry >= job.max_retry {
            tracing::error!(
                job_id = %job.id,
                topic = %job.topic,
                "Job {} failed after {} retries: {}",
                job.id,
                job.retry + 1,
                err
            );
            job.fail(self.ctx.clock.now_nanos());
            self.ctx.observer.job_failed(job);
            return self.ctx.store.update(job).await;
        }

        tracing::warn!(
            job_id = %job.id,
            topic = %job.topic,
            "Job {} failed on try {} of {}: {}",
            job.id,
            job.retry + 1,
            job.max_retry,
            err
        );
        let (retry, max_retry) = (job.retry, job.max_retry);
        let backoff = self.ctx.backoff.delay(retry);
        job.schedule_retry(self.ctx.clock.now_nanos(), backoff);
        self.ctx.observer.job_retry(job, retry, max_retry);
        self.ctx.store.update(job).await
    }
}
