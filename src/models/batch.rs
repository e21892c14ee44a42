use serde::{Deserialize, Serialize};
use strum::Display;

/// Position of a long-running "queue all pending work" run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchCursor {
    pub offset: u64,
    pub batch_number: u32,
    pub total_queued: u64,
    pub total_skipped: u64,
    pub done: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BatchState {
    #[default]
    Idle,
    Queuing,
    Paused,
    Complete,
    Stopped,
}

/// Response of the external batch-queue endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchResponse {
    pub queued: u64,
    #[serde(default)]
    pub skipped: u64,
    pub next_offset: u64,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub remaining: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl BatchResponse {
    pub fn is_complete(&self) -> bool {
        self.done || self.remaining == Some(0)
    }
}

/// Read-only view of the controller for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchSnapshot {
    pub state: BatchState,
    pub cursor: BatchCursor,
    pub batch_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
