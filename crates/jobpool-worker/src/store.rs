//! Durable job store seam and an in-memory implementation.

use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing;
use uuid::Uuid;

use jobpool_core::error::AppError;
use jobpool_core::result::AppResult;
use jobpool_entity::job::{Job, JobState};

/// Persistence used by workers after every attempt.
///
/// The store owns jobs between deliveries and must not hand out a job
/// that a worker is still processing. Delivery is at-least-once: a job
/// whose attempt never reaches `update` stays `Waiting` and may be
/// delivered again.
#[async_trait]
pub trait JobStore: Send + Sync + fmt::Debug + 'static {
    /// Persist the full current state of a job.
    async fn update(&self, job: &Job) -> AppResult<()>;
}

/// Process-local store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    /// Jobs by id
    jobs: DashMap<Uuid, Job>,
    /// Ids handed out by `claim_next` and not yet updated
    claimed: Mutex<HashSet<Uuid>>,
}

impl MemoryJobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job. Fails if the id is already present.
    pub fn create(&self, job: Job) -> AppResult<Job> {
        if self.jobs.contains_key(&job.id) {
            return Err(AppError::conflict(format!("job {} already exists", job.id)));
        }
        tracing::debug!(
            "Stored job: id={}, topic='{}', rank={}, priority={}",
            job.id,
            job.topic,
            job.rank,
            job.priority
        );
        self.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    /// Get a copy of a job by id
    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id).map(|entry| entry.value().clone())
    }

    /// All jobs, optionally filtered by state, in no particular order
    pub fn list(&self, state: Option<JobState>) -> Vec<Job> {
        self.jobs
            .iter()
            .filter(|entry| state.is_none_or(|s| entry.state == s))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of jobs in the given state
    pub fn count_by_state(&self, state: JobState) -> usize {
        self.jobs.iter().filter(|entry| entry.state == state).count()
    }

    /// Number of jobs handed out and not yet updated
    pub fn claimed_count(&self) -> usize {
        self.lock_claimed().len()
    }

    /// Hand out the waiting job with the highest priority whose `after`
    /// is not later than `now`. Ties go to the earliest `after`.
    ///
    /// The job stays claimed until it is passed to [`JobStore::update`].
    pub fn claim_next(&self, now: i64) -> Option<Job> {
        let mut claimed = self.lock_claimed();
        let next = self
            .jobs
            .iter()
            .filter(|entry| {
                entry.state == JobState::Waiting
                    && entry.after <= now
                    && !claimed.contains(entry.key())
            })
            .max_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| b.after.cmp(&a.after))
            })
            .map(|entry| entry.value().clone())?;

        claimed.insert(next.id);
        Some(next)
    }

    /// Return a claimed job to the store without changing it
    pub fn release(&self, id: Uuid) -> bool {
        self.lock_claimed().remove(&id)
    }

    fn lock_claimed(&self) -> std::sync::MutexGuard<'_, HashSet<Uuid>> {
        self.claimed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn update(&self, job: &Job) -> AppResult<()> {
        let mut stored = self
            .jobs
            .get_mut(&job.id)
            .ok_or_else(|| AppError::not_found(format!("job {} not found", job.id)))?;
        *stored = job.clone();
        drop(stored);

        self.release(job.id);
        tracing::debug!("Updated job: id={}, state={}", job.id, job.state);
        Ok(())
    }
}
