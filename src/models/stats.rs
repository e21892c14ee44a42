use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::job::{JobStatus, QueueName};

/// Counters for a single queue. `total` always equals the sum of the four
/// status counters; it is only ever written by [`QueueCounts::recompute_total`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub total: u64,
}

impl QueueCounts {
    pub fn new(pending: u64, processing: u64, completed: u64, failed: u64) -> Self {
        let mut counts = Self {
            pending,
            processing,
            completed,
            failed,
            total: 0,
        };
        counts.recompute_total();
        counts
    }

    /// Build counts from `(status, count)` rows of a full table scan.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (JobStatus, u64)>,
    {
        let mut counts = Self::default();
        for (status, n) in rows {
            *counts.slot_mut(status) += n;
        }
        counts.recompute_total();
        counts
    }

    pub fn get(&self, status: JobStatus) -> u64 {
        match status {
            JobStatus::Pending => self.pending,
            JobStatus::Processing => self.processing,
            JobStatus::Completed => self.completed,
            JobStatus::Failed => self.failed,
        }
    }

    pub(crate) fn slot_mut(&mut self, status: JobStatus) -> &mut u64 {
        match status {
            JobStatus::Pending => &mut self.pending,
            JobStatus::Processing => &mut self.processing,
            JobStatus::Completed => &mut self.completed,
            JobStatus::Failed => &mut self.failed,
        }
    }

    pub(crate) fn recompute_total(&mut self) {
        self.total = self.pending + self.processing + self.completed + self.failed;
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.pending + self.processing + self.completed + self.failed
    }

    pub(crate) fn add(&mut self, other: &QueueCounts) {
        self.pending += other.pending;
        self.processing += other.processing;
        self.completed += other.completed;
        self.failed += other.failed;
        self.recompute_total();
    }
}

/// Per-queue stats as exposed to readers.
pub type QueueStats = BTreeMap<QueueName, QueueCounts>;
