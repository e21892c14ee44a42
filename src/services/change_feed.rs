use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use redis::{AsyncCommands, ErrorKind};

use crate::models::job::{ChangeEvent, QueueName};

const CHANNEL_PREFIX: &str = "album_dashboard:changes";

/// Stream of row changes for one queue. The stream ending means the
/// subscription was lost and may be re-established.
pub type ChangeStream = BoxStream<'static, Result<ChangeEvent, FeedError>>;

/// Low-latency, best-effort change subscription (the push channel).
#[async_trait]
pub trait ChangeFeed: Send + Sync + 'static {
    async fn subscribe(&self, queue: QueueName) -> Result<ChangeStream, FeedError>;
}

pub fn channel_for(queue: QueueName) -> String {
    format!("{}:{}", CHANNEL_PREFIX, queue)
}

/// Redis pub/sub change feed. The job store publishes one JSON
/// [`ChangeEvent`] per row change on `album_dashboard:changes:{queue}`.
pub struct RedisChangeFeed {
    client: redis::Client,
}

impl RedisChangeFeed {
    pub fn new(redis_url: &str) -> Result<Self, FeedError> {
        let client = redis::Client::open(redis_url).map_err(FeedError::Redis)?;
        Ok(Self { client })
    }

    /// Publish a change event. Used by bridges and integration tests.
    pub async fn publish(&self, event: &ChangeEvent) -> Result<(), FeedError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(FeedError::Redis)?;
        let payload = serde_json::to_string(event).map_err(FeedError::Malformed)?;
        conn.publish::<_, _, ()>(channel_for(event.queue_name), payload)
            .await
            .map_err(FeedError::Redis)?;
        Ok(())
    }

    /// Check Redis connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), FeedError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(FeedError::Redis)?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(FeedError::Redis)?;
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for RedisChangeFeed {
    async fn subscribe(&self, queue: QueueName) -> Result<ChangeStream, FeedError> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(FeedError::Redis)?;
        pubsub
            .subscribe(channel_for(queue))
            .await
            .map_err(FeedError::Redis)?;

        tracing::info!(queue = %queue, "Subscribed to change feed");

        let stream = pubsub.into_on_message().map(|msg| {
            let payload: String = msg.get_payload().map_err(FeedError::Redis)?;
            serde_json::from_str::<ChangeEvent>(&payload).map_err(FeedError::Malformed)
        });
        Ok(stream.boxed())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Malformed change event: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Change feed unavailable: {0}")]
    Terminal(String),
}

impl FeedError {
    /// Errors that reconnecting cannot fix.
    pub fn is_terminal(&self) -> bool {
        match self {
            FeedError::Terminal(_) => true,
            FeedError::Redis(e) => matches!(
                e.kind(),
                ErrorKind::AuthenticationFailed | ErrorKind::InvalidClientConfig
            ),
            FeedError::Malformed(_) => false,
        }
    }
}
