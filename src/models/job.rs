use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Processing queues tracked by the dashboard. New queues are added here.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueueName {
    Ai,
    Video,
}

impl QueueName {
    pub const ALL: [QueueName; 2] = [QueueName::Ai, QueueName::Video];

    /// Backing table in the job store.
    pub fn table(self) -> &'static str {
        match self {
            QueueName::Ai => "ai_processing_jobs",
            QueueName::Video => "video_processing_jobs",
        }
    }
}

/// Status of a job in one of the processing queues.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];
}

/// Cached copy of a job row. The job store owns the row; this is read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub queue_name: QueueName,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub worker_id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Job {
    /// Most recent lifecycle timestamp on the row.
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.completed_at
            .or(self.started_at)
            .unwrap_or(self.created_at)
    }

    /// Short human-readable outcome, if the row carries one.
    pub fn result_summary(&self) -> Option<String> {
        if self.status == JobStatus::Failed {
            return self.error_message.clone();
        }
        self.payload
            .get("summary")
            .and_then(|s| s.as_str())
            .map(str::to_string)
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkerStatus {
    #[default]
    Idle,
    Busy,
    Offline,
}

/// A processing worker as reported by the job store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Worker {
    pub worker_id: String,
    #[serde(default)]
    pub queue_name: Option<QueueName>,
    #[serde(default)]
    pub current_job_id: Option<Uuid>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    pub status: WorkerStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Row change delivered by the push channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub event_type: ChangeKind,
    pub queue_name: QueueName,
    #[serde(default)]
    pub old: Option<Job>,
    #[serde(default)]
    pub new: Option<Job>,
}

impl ChangeEvent {
    pub fn old_status(&self) -> Option<JobStatus> {
        match self.event_type {
            ChangeKind::Insert => None,
            _ => self.old.as_ref().map(|j| j.status),
        }
    }

    pub fn new_status(&self) -> Option<JobStatus> {
        match self.event_type {
            ChangeKind::Delete => None,
            _ => self.new.as_ref().map(|j| j.status),
        }
    }

    /// The row the event is about: the new image, or the old one for deletes.
    pub fn row(&self) -> Option<&Job> {
        self.new.as_ref().or(self.old.as_ref())
    }
}
