//! Retry backoff configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the backoff policy that shapes retry priorities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Base delay in milliseconds; the n-th retry waits `base * 2^n`.
    #[serde(default = "default_base_ms")]
    pub base_ms: u64,
    /// Upper bound in milliseconds. `0` disables the cap.
    #[serde(default)]
    pub max_ms: u64,
}

impl BackoffConfig {
    /// Base delay as a [`Duration`].
    pub fn base(&self) -> Duration {
        Duration::from_millis(self.base_ms)
    }

    /// Cap as a [`Duration`], if one is configured.
    pub fn max(&self) -> Option<Duration> {
        (self.max_ms > 0).then(|| Duration::from_millis(self.max_ms))
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: default_base_ms(),
            max_ms: 0,
        }
    }
}

fn default_base_ms() -> u64 {
    1000
}
