//! Collaborators shared by every worker of a pool.

use std::fmt;
use std::sync::Arc;

use crate::backoff::{BackoffPolicy, ExponentialBackoff};
use crate::clock::{Clock, SystemClock};
use crate::ledger::ConcurrencyLedger;
use crate::observer::{JobObserver, NoopObserver};
use crate::registry::HandlerRegistry;
use crate::store::JobStore;

/// Handler registry, store, ledger, backoff policy, observer and clock
/// handed to each worker.
#[derive(Clone)]
pub struct WorkerContext {
    /// Topic → handler lookup
    pub registry: Arc<HandlerRegistry>,
    /// Persistence for updated jobs
    pub store: Arc<dyn JobStore>,
    /// In-flight counts per rank
    pub ledger: Arc<ConcurrencyLedger>,
    /// Delay used to re-rank retried jobs
    pub backoff: Arc<dyn BackoffPolicy>,
    /// Lifecycle signal sink
    pub observer: Arc<dyn JobObserver>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerContext")
            .field("registry", &self.registry)
            .field("store", &self.store)
            .field("ledger", &self.ledger)
            .field("observer", &self.observer)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl WorkerContext {
    /// Create a context with a fresh ledger, the default exponential
    /// backoff, no observer and the system clock.
    pub fn new(registry: Arc<HandlerRegistry>, store: Arc<dyn JobStore>) -> Self {
        Self {
            registry,
            store,
            ledger: Arc::new(ConcurrencyLedger::new()),
            backoff: Arc::new(ExponentialBackoff::default()),
            observer: Arc::new(NoopObserver),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<ConcurrencyLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn BackoffPolicy>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
