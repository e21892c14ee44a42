use std::collections::VecDeque;

use crate::models::activity::{ActivityLogItem, NewActivity};

pub const DEFAULT_CAPACITY: usize = 200;

/// Bounded activity feed; the oldest item is evicted once full.
///
/// While paused, appends are dropped. The reconciler still applies the
/// underlying changes to the counters, so pausing only affects what the feed
/// shows.
#[derive(Debug, Clone)]
pub struct ActivityLogBuffer {
    items: VecDeque<ActivityLogItem>,
    capacity: usize,
    next_id: u64,
    paused: bool,
}

impl Default for ActivityLogBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ActivityLogBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
            paused: false,
        }
    }

    /// Record an item. Returns `false` if the log is paused.
    pub fn append(&mut self, entry: NewActivity) -> bool {
        if self.paused {
            return false;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        let item = ActivityLogItem {
            id: self.next_id,
            timestamp: entry.timestamp,
            status: entry.status,
            event_type: entry.event_type,
            job_id: entry.job_id,
            queue_name: entry.queue_name,
            worker_id: entry.worker_id,
            result_summary: entry.result_summary,
        };
        self.next_id += 1;
        self.items.push_back(item);
        true
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items oldest first.
    pub fn items(&self) -> Vec<ActivityLogItem> {
        self.items.iter().cloned().collect()
    }

    /// Up to `limit` items, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ActivityLogItem> {
        self.items.iter().rev().take(limit).cloned().collect()
    }
}
