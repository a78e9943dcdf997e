//! Worker pool configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent workers sharing the intake feed.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Capacity of the intake feed buffer.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Maximum number of in-flight jobs per rank.
    #[serde(default = "default_rank_limits")]
    pub rank_limits: Vec<RankLimit>,
}

/// In-flight bound for one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankLimit {
    /// The rank being bounded.
    pub rank: i32,
    /// Maximum number of jobs of this rank processed at once.
    pub limit: usize,
}

impl WorkerConfig {
    /// Reject settings a pool cannot start with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.concurrency == 0 {
            return Err(AppError::configuration(
                "worker.concurrency must be at least 1",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(AppError::configuration(
                "worker.queue_capacity must be at least 1",
            ));
        }
        Ok(())
    }

    /// In-flight limit for a rank. Unlisted ranks are unbounded.
    pub fn rank_limit(&self, rank: i32) -> Option<usize> {
        self.rank_limits
            .iter()
            .find(|entry| entry.rank == rank)
            .map(|entry| entry.limit)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
            rank_limits: default_rank_limits(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

fn default_rank_limits() -> Vec<RankLimit> {
    vec![RankLimit { rank: 0, limit: 5 }]
}
