//! Job entity model and lifecycle transitions.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use jobpool_core::error::AppError;

use super::status::{JobState, RetryBackoff};

/// A background job.
///
/// All timestamps are nanoseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: Uuid,
    /// Topic selecting the handler (e.g., `"send-email"`).
    pub topic: String,
    /// Handler arguments (JSON).
    #[serde(default)]
    pub args: serde_json::Value,
    /// Concurrency class; bounds in-flight work per rank.
    pub rank: i32,
    /// Ordering key; higher values are delivered first.
    pub priority: i64,
    /// Current lifecycle state.
    pub state: JobState,
    /// Attempts already made.
    pub retry: i32,
    /// Attempts permitted before the job fails terminally.
    pub max_retry: i32,
    /// Backoff strategy for `after`.
    pub retry_backoff: RetryBackoff,
    /// Base wait before a retry, in nanoseconds.
    pub retry_wait: i64,
    /// Earliest instant the job may be delivered again.
    pub after: i64,
    /// Optional group used to correlate related jobs.
    pub correlation_group: Option<String>,
    /// Optional identifier within `correlation_group`.
    pub correlation_id: Option<String>,
    /// When the job was created.
    pub created: i64,
    /// When the job reached a terminal state.
    pub completed: Option<i64>,
}

impl Job {
    /// Create a waiting job for `topic` with no retries.
    pub fn new(topic: impl Into<String>) -> Self {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            args: serde_json::Value::Null,
            rank: 0,
            priority: 0,
            state: JobState::Waiting,
            retry: 0,
            max_retry: 0,
            retry_backoff: RetryBackoff::Fixed,
            retry_wait: 0,
            after: now,
            correlation_group: None,
            correlation_id: None,
            created: now,
            completed: None,
        }
    }

    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = args;
        self
    }

    pub fn with_rank(mut self, rank: i32) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retry(mut self, max_retry: i32) -> Self {
        self.max_retry = max_retry;
        self
    }

    pub fn with_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the base retry wait. Saturates at `i64::MAX` nanoseconds.
    pub fn with_retry_wait(mut self, wait: Duration) -> Self {
        self.retry_wait = i64::try_from(wait.as_nanos()).unwrap_or(i64::MAX);
        self
    }

    pub fn with_correlation(mut self, group: impl Into<String>, id: impl Into<String>) -> Self {
        self.correlation_group = Some(group.into());
        self.correlation_id = Some(id.into());
        self
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Check if a failed attempt would be scheduled for another try.
    pub fn can_retry(&self) -> bool {
        !self.is_terminal() && self.retry < self.max_retry
    }

    /// Wait added to `after` when this job is scheduled for a retry.
    ///
    /// Exponential backoff uses the retry count *before* it is incremented,
    /// so the first retry (`retry == 0`) waits half of `retry_wait`.
    pub fn retry_delay_nanos(&self) -> i64 {
        match self.retry_backoff {
            RetryBackoff::Exponential => {
                let factor = 2f64.powi(self.retry.saturating_sub(1));
                (self.retry_wait as f64 * factor) as i64
            }
            RetryBackoff::Fixed => self.retry_wait,
        }
    }

    /// Mark the job as succeeded at `now`.
    pub fn succeed(&mut self, now: i64) {
        self.state = JobState::Succeeded;
        self.completed = Some(now);
    }

    /// Mark the job as terminally failed at `now`. `retry` is left as is.
    pub fn fail(&mut self, now: i64) {
        self.state = JobState::Failed;
        self.completed = Some(now);
    }

    /// Put the job back to `Waiting` for another attempt.
    ///
    /// `after` moves to `now` plus [`Job::retry_delay_nanos`], and `priority`
    /// becomes `-(now + backoff)` so jobs scheduled further out sort later.
    pub fn schedule_retry(&mut self, now: i64, backoff: Duration) {
        let backoff = i64::try_from(backoff.as_nanos()).unwrap_or(i64::MAX);
        self.after = now.saturating_add(self.retry_delay_nanos());
        self.priority = now.saturating_add(backoff).saturating_neg();
        self.state = JobState::Waiting;
        self.retry += 1;
    }

    /// `after` as a UTC timestamp.
    pub fn after_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.after)
    }

    /// `completed` as a UTC timestamp.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed.map(DateTime::from_timestamp_nanos)
    }
}

/// Data required to create a new job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateJob {
    /// Topic selecting the handler.
    pub topic: String,
    /// Handler arguments.
    #[serde(default)]
    pub args: serde_json::Value,
    /// Concurrency class.
    #[serde(default)]
    pub rank: i32,
    /// Initial ordering key.
    #[serde(default)]
    pub priority: i64,
    /// Attempts permitted before terminal failure.
    #[serde(default)]
    pub max_retry: i32,
    /// Backoff strategy.
    #[serde(default)]
    pub retry_backoff: RetryBackoff,
    /// Base retry wait in milliseconds.
    #[serde(default)]
    pub retry_wait_ms: u64,
    /// Optional correlation group and id.
    #[serde(default)]
    pub correlation: Option<(String, String)>,
}

impl CreateJob {
    /// Validate the request and build a waiting [`Job`].
    pub fn into_job(self) -> Result<Job, AppError> {
        if self.topic.trim().is_empty() {
            return Err(AppError::validation("job topic must not be empty"));
        }
        if self.max_retry < 0 {
            return Err(AppError::validation("max_retry must not be negative"));
        }

        let mut job = Job::new(self.topic)
            .with_args(self.args)
            .with_rank(self.rank)
            .with_priority(self.priority)
            .with_max_retry(self.max_retry)
            .with_backoff(self.retry_backoff)
            .with_retry_wait(Duration::from_millis(self.retry_wait_ms));
        if let Some((group, id)) = self.correlation {
            job = job.with_correlation(group, id);
        }
        Ok(job)
    }
}
