use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::models::job::{Job, QueueName, Worker};
use crate::models::stats::QueueCounts;
use crate::services::source::{QueueSource, SourceError};

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

pub mod queries;

/// Poll source backed by the job tables.
#[derive(Clone)]
pub struct PgQueueSource {
    pool: PgPool,
}

impl PgQueueSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueSource for PgQueueSource {
    async fn stats(&self, queue: QueueName) -> Result<QueueCounts, SourceError> {
        queries::queue_stats(&self.pool, queue).await
    }

    async fn recent_jobs(&self, queue: QueueName, limit: i64) -> Result<Vec<Job>, SourceError> {
        queries::recent_jobs(&self.pool, queue, limit).await
    }

    async fn active_jobs(&self, queue: QueueName) -> Result<Vec<Job>, SourceError> {
        queries::active_jobs(&self.pool, queue).await
    }

    async fn worker_status(&self) -> Result<Vec<Worker>, SourceError> {
        queries::workers(&self.pool).await
    }

    async fn clear_queue(&self, queue: QueueName) -> Result<u64, SourceError> {
        let removed = queries::clear_pending(&self.pool, queue).await?;
        tracing::info!(queue = %queue, removed, "Cleared pending jobs");
        Ok(removed)
    }
}
