//! Lifecycle signals emitted by workers.

use std::fmt;

use tracing;

use jobpool_entity::job::Job;

/// Receives lifecycle signals from workers.
///
/// Implementations must not block; every method defaults to a no-op.
pub trait JobObserver: Send + Sync + fmt::Debug {
    /// The handler is about to run.
    fn job_started(&self, _job: &Job) {}

    /// The job succeeded and was persisted.
    fn job_succeeded(&self, _job: &Job) {}

    /// The job failed with no retries left.
    fn job_failed(&self, _job: &Job) {}

    /// The job failed and will be retried. `retry` is the count before
    /// this attempt was added.
    fn job_retry(&self, _job: &Job, _retry: i32, _max_retry: i32) {}
}

/// Observer that ignores every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl JobObserver for NoopObserver {}

/// Observer that turns signals into debug-level tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl JobObserver for TracingObserver {
    fn job_started(&self, job: &Job) {
        tracing::debug!(job_id = %job.id, topic = %job.topic, "Job started");
    }

    fn job_succeeded(&self, job: &Job) {
        tracing::debug!(job_id = %job.id, topic = %job.topic, "Job succeeded");
    }

    fn job_failed(&self, job: &Job) {
        tracing::debug!(job_id = %job.id, topic = %job.topic, retry = job.retry, "Job failed");
    }

    fn job_retry(&self, job: &Job, retry: i32, max_retry: i32) {
        tracing::debug!(
            job_id = %job.id,
            topic = %job.topic,
            retry,
            max_retry,
            after = %job.after_at(),
            "Job scheduled for retry"
        );
    }
}
