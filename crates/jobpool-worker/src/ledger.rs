//! Per-rank accounting of jobs currently being processed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing;

/// Rank → in-flight count, shared by the dispatcher and every worker.
///
/// A single lock guards the whole map and is only held for the map
/// mutation itself.
#[derive(Debug, Default)]
pub struct ConcurrencyLedger {
    working: Mutex<HashMap<i32, usize>>,
}

impl ConcurrencyLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i32, usize>> {
        self.working.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record one more in-flight job for `rank`. Returns the new count.
    pub fn increment(&self, rank: i32) -> usize {
        let mut working = self.lock();
        let count = working.entry(rank).or_insert(0);
        *count += 1;
        *count
    }

    /// Record one more in-flight job for `rank` if fewer than `limit` are running.
    pub fn try_acquire(&self, rank: i32, limit: usize) -> bool {
        let mut working = self.lock();
        let count = working.entry(rank).or_insert(0);
        if *count >= limit {
            return false;
        }
        *count += 1;
        true
    }

    /// Record that a job of `rank` finished. Returns the new count.
    ///
    /// The count never drops below zero.
    pub fn decrement(&self, rank: i32) -> usize {
        let mut working = self.lock();
        let count = working.entry(rank).or_insert(0);
        if *count == 0 {
            tracing::debug!("In-flight count for rank {} already zero", rank);
            return 0;
        }
        *count -= 1;
        *count
    }

    /// Number of in-flight jobs for `rank`.
    pub fn in_flight(&self, rank: i32) -> usize {
        self.lock().get(&rank).copied().unwrap_or(0)
    }

    /// Number of in-flight jobs across all ranks.
    pub fn total(&self) -> usize {
        self.lock().values().sum()
    }

    /// Copy of the current counts.
    pub fn snapshot(&self) -> HashMap<i32, usize> {
        self.lock().clone()
    }

    /// Guard that decrements `rank` once when dropped.
    pub fn guard(&self, rank: i32) -> InFlightGuard<'_> {
        InFlightGuard { ledger: self, rank }
    }
}

/// Releases one in-flight slot for its rank on drop.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the guard is dropped"]
pub struct InFlightGuard<'a> {
    ledger: &'a ConcurrencyLedger,
    rank: i32,
}

impl InFlightGuard<'_> {
    /// Rank this guard releases.
    pub fn rank(&self) -> i32 {
        self.rank
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.ledger.decrement(self.rank);
    }
}
