use async_trait::async_trait;

use crate::models::job::{Job, QueueName, Worker};
use crate::models::stats::QueueCounts;

/// Full-snapshot view of the job store, used by the poll channel.
#[async_trait]
pub trait QueueSource: Send + Sync + 'static {
    /// Counters recomputed from a full scan of the queue's rows.
    async fn stats(&self, queue: QueueName) -> Result<QueueCounts, SourceError>;

    /// Most recently created jobs, newest first.
    async fn recent_jobs(&self, queue: QueueName, limit: i64) -> Result<Vec<Job>, SourceError>;

    /// Jobs currently being processed.
    async fn active_jobs(&self, queue: QueueName) -> Result<Vec<Job>, SourceError>;

    async fn worker_status(&self) -> Result<Vec<Worker>, SourceError>;

    /// Drop pending work from a queue. Returns the number of rows removed.
    async fn clear_queue(&self, queue: QueueName) -> Result<u64, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Unexpected value in column {column}: {value}")]
    Decode { column: &'static str, value: String },

    #[error("Job source unavailable: {0}")]
    Unavailable(String),
}
