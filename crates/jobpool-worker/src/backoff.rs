//! Backoff policies used to re-rank retried jobs.

use std::time::Duration;

use jobpool_core::config::backoff::BackoffConfig;

/// Maps a retry count to a delay.
///
/// The worker uses the delay to push a retried job's priority back so
/// jobs retried more often sort behind fresher ones.
pub trait BackoffPolicy: Send + Sync {
    /// Delay for a job that has already been tried `retry` times.
    fn delay(&self, retry: i32) -> Duration;
}

impl<F> BackoffPolicy for F
where
    F: Fn(i32) -> Duration + Send + Sync,
{
    fn delay(&self, retry: i32) -> Duration {
        self(retry)
    }
}

/// `base * 2^retry`, optionally capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Option<Duration>,
}

impl ExponentialBackoff {
    /// Uncapped policy starting at `base`.
    pub fn new(base: Duration) -> Self {
        Self { base, max: None }
    }

    /// Cap every delay at `max`.
    pub fn with_max(mut self, max: Duration) -> Self {
        self.max = Some(max);
        self
    }

    /// Build the policy from the `[backoff]` configuration section.
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self {
            base: config.base(),
            max: config.max(),
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay(&self, retry: i32) -> Duration {
        let exponent = u32::try_from(retry.max(0)).unwrap_or(0);
        let delay = 2u32
            .checked_pow(exponent)
            .and_then(|factor| self.base.checked_mul(factor))
            .unwrap_or(Duration::MAX);
        match self.max {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}
