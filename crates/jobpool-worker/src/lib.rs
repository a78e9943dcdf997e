//! Background job execution for jobpool.
//!
//! This crate provides:
//! - A [`Worker`] that consumes jobs from a shared intake feed and applies
//!   the retry / terminal-failure policy after each attempt
//! - A [`WorkerPool`] that starts a fixed set of workers and joins them on shutdown
//! - A [`HandlerRegistry`] that maps job topics to handlers
//! - A [`ConcurrencyLedger`] tracking in-flight jobs per rank
//! - The [`JobStore`], [`BackoffPolicy`], [`JobObserver`] and [`Clock`]
//!   seams, with in-memory and default implementations

pub mod backoff;
pub mod clock;
pub mod context;
pub mod feed;
pub mod ledger;
pub mod observer;
pub mod pool;
pub mod registry;
pub mod store;
pub mod worker;

pub use backoff::{BackoffPolicy, ExponentialBackoff};
pub use clock::{Clock, SystemClock};
pub use context::WorkerContext;
pub use feed::{IntakeFeed, intake_feed};
pub use ledger::{ConcurrencyLedger, InFlightGuard};
pub use observer::{JobObserver, NoopObserver, TracingObserver};
pub use pool::{Dispatch, WorkerPool};
pub use registry::{HandlerRegistry, JobExecutionError, JobHandler, handler_fn};
pub use store::{JobStore, MemoryJobStore};
pub use worker::Worker;
