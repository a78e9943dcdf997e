//! Multi-consumer intake feed shared by all workers of a pool.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use jobpool_entity::job::Job;

/// Create a bounded intake feed.
///
/// Dropping every sender closes the feed; workers drain what is buffered
/// and then stop.
pub fn intake_feed(capacity: usize) -> (mpsc::Sender<Job>, IntakeFeed) {
    let (sender, receiver) = mpsc::channel(capacity);
    (sender, IntakeFeed::new(receiver))
}

/// Receiving side of the feed. Clones share one queue, so every job is
/// delivered to exactly one consumer.
#[derive(Debug, Clone)]
pub struct IntakeFeed {
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl IntakeFeed {
    /// Wrap an existing receiver.
    pub fn new(receiver: mpsc::Receiver<Job>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Wait for the next job. Returns `None` once the feed is closed and empty.
    pub async fn next(&self) -> Option<Job> {
        self.receiver.lock().await.recv().await
    }
}
