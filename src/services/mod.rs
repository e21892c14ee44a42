pub mod activity_log;
pub mod ai_client;
pub mod batch;
pub mod change_feed;
pub mod geometry;
pub mod matcher;
pub mod reconciler;
pub mod selection;
pub mod source;
pub mod stats_store;
pub mod tag_sync;
