//! # jobpool-entity
//!
//! Domain entity models for jobpool. The [`job::Job`] record carries the
//! retry bookkeeping and the lifecycle transition rules that workers apply
//! after each processing attempt.

pub mod job;

pub use job::{CreateJob, Job, JobState, RetryBackoff};
