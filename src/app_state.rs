use sqlx::PgPool;
use std::sync::Arc;

use crate::services::{
    batch::BatchCursorController, change_feed::RedisChangeFeed, reconciler::Reconciler,
    source::QueueSource, tag_sync::TagSyncSession,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub feed: Arc<RedisChangeFeed>,
    pub source: Arc<dyn QueueSource>,
    pub reconciler: Reconciler,
    pub batch: Arc<BatchCursorController>,
    pub tags: Arc<TagSyncSession>,
    pub default_iou_threshold: f64,
}

impl AppState {
    pub fn new(
        db: PgPool,
        feed: Arc<RedisChangeFeed>,
        source: Arc<dyn QueueSource>,
        reconciler: Reconciler,
        batch: BatchCursorController,
        tags: TagSyncSession,
        default_iou_threshold: f64,
    ) -> Self {
        Self {
            db,
            feed,
            source,
            reconciler,
            batch: Arc::new(batch),
            tags: Arc::new(tags),
            default_iou_threshold,
        }
    }
}
