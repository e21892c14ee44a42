use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::activity::ActivityLogItem;
use crate::models::stats::{QueueCounts, QueueStats};
use crate::services::reconciler::ReconcilerStatus;

/// Query for `GET /api/v1/queues/stats`.
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Comma-separated queue names to aggregate; defaults to all tracked queues.
    pub queues: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub queues: QueueStats,
    pub combined: QueueCounts,
    pub status: ReconcilerStatus,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub items: Vec<ActivityLogItem>,
    pub paused: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearQueueResponse {
    pub removed: u64,
}

/// Request to preview face tag sync.
#[derive(Debug, Deserialize, Validate)]
pub struct PreviewRequest {
    #[garde(range(min = 0.0, max = 1.0))]
    pub iou_threshold: Option<f64>,

    #[garde(range(min = 1, max = 500))]
    pub limit: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ToggleRequest {
    #[garde(skip)]
    pub manual_tag_id: Uuid,

    #[garde(skip)]
    pub ai_face_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub selected: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExclusionRequest {
    #[garde(skip)]
    pub asset_id: Uuid,

    #[garde(skip)]
    pub face_id: Uuid,
}

/// Error body returned by every API endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
