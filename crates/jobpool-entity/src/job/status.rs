//! Job state and retry backoff enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted lifecycle state of a job.
///
/// There is no persisted "running" state: a job held by a worker stays
/// `Waiting` in the store until the attempt finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Eligible for delivery once its `after` instant has passed.
    #[default]
    Waiting,
    /// The handler completed without error.
    Succeeded,
    /// The handler failed and no retries remain.
    Failed,
}

impl JobState {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Return the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the wait before the next attempt grows with the retry count.
///
/// Serialized as `"exponential"` or `"fixed"`; any other string
/// deserializes to [`RetryBackoff::Fixed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RetryBackoff {
    /// Wait `retry_wait * 2^(retry - 1)`.
    Exponential,
    /// Wait `retry_wait` every time.
    #[default]
    Fixed,
}

impl RetryBackoff {
    /// Return the strategy as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exponential => "exponential",
            Self::Fixed => "fixed",
        }
    }
}

impl From<&str> for RetryBackoff {
    fn from(value: &str) -> Self {
        match value {
            "exponential" => Self::Exponential,
            _ => Self::Fixed,
        }
    }
}

impl From<String> for RetryBackoff {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<RetryBackoff> for String {
    fn from(value: RetryBackoff) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RetryBackoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
