//! Handler registry — maps job topics to their handlers.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing;

use jobpool_core::error::AppError;
use jobpool_entity::job::Job;

/// Trait for job handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + fmt::Debug {
    /// Get the topic this handler processes
    fn topic(&self) -> &str;

    /// Execute the job. Any error counts as a failed attempt.
    async fn execute(&self, job: &Job) -> Result<(), JobExecutionError>;
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// The handler reported a failure
    #[error("Job failure: {0}")]
    Failed(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    /// Create a handler failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Handler backed by an async closure. See [`handler_fn`].
pub struct FnHandler<F> {
    topic: String,
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler")
            .field("topic", &self.topic)
            .finish()
    }
}

#[async_trait]
impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), JobExecutionError>> + Send + 'static,
{
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn execute(&self, job: &Job) -> Result<(), JobExecutionError> {
        (self.f)(job.clone()).await
    }
}

/// Wrap an async closure as a handler for `topic`.
///
/// The closure receives a copy of the job; mutations are not persisted.
pub fn handler_fn<F, Fut>(topic: impl Into<String>, f: F) -> Arc<dyn JobHandler>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), JobExecutionError>> + Send + 'static,
{
    Arc::new(FnHandler {
        topic: topic.into(),
        f,
    })
}

/// Topic → handler lookup shared by all workers.
///
/// Registration may happen while workers are running.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    /// Registered handlers by topic
    handlers: DashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous handler for its topic
    pub fn register(&self, handler: Arc<dyn JobHandler>) {
        let topic = handler.topic().to_string();
        if self.handlers.insert(topic.clone(), handler).is_some() {
            tracing::warn!("Replaced job handler for topic '{}'", topic);
        } else {
            tracing::info!("Registered job handler for topic '{}'", topic);
        }
    }

    /// Remove the handler for a topic, returning it if one was registered
    pub fn unregister(&self, topic: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.remove(topic).map(|(_, handler)| handler)
    }

    /// Look up the handler for a topic
    pub fn get(&self, topic: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(topic).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up the handler for a topic, failing with a no-processor error
    pub fn resolve(&self, topic: &str) -> Result<Arc<dyn JobHandler>, AppError> {
        self.get(topic).ok_or_else(|| AppError::no_processor(topic))
    }

    /// Check if a handler is registered for a topic
    pub fn has_handler(&self, topic: &str) -> bool {
        self.handlers.contains_key(topic)
    }

    /// Get the list of registered topics
    pub fn topics(&self) -> Vec<String> {
        self.handlers.iter().map(|entry| entry.key().clone()).collect()
    }
}
