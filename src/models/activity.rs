use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{ChangeKind, JobStatus, QueueName};

/// One reconciled change as shown in the activity feed. Never mutated after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityLogItem {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub status: JobStatus,
    /// `None` for items seeded from the first poll rather than a change event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<ChangeKind>,
    pub job_id: Uuid,
    pub queue_name: QueueName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_summary: Option<String>,
}

/// Activity item before the log assigns it a sequence id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub timestamp: DateTime<Utc>,
    pub status: JobStatus,
    pub event_type: Option<ChangeKind>,
    pub job_id: Uuid,
    pub queue_name: QueueName,
    pub worker_id: Option<String>,
    pub result_summary: Option<String>,
}
