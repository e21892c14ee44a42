use crate::models::job::{JobStatus, QueueName};
use crate::models::stats::{QueueCounts, QueueStats};

/// In-memory counters per queue.
///
/// Snapshots from the poll channel overwrite a queue wholesale; push deltas
/// adjust single counters. Decrements clamp at zero so a delta that arrives
/// after a snapshot already accounted for it cannot drive a counter negative.
#[derive(Debug, Clone, Default)]
pub struct QueueStatsStore {
    queues: QueueStats,
}

impl QueueStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_snapshot(&mut self, queue: QueueName, mut counts: QueueCounts) {
        counts.recompute_total();
        self.queues.insert(queue, counts);
    }

    /// Apply one job transition. `new_status` is `None` for deletes,
    /// `old_status` is `None` for inserts.
    pub fn apply_delta(
        &mut self,
        queue: QueueName,
        old_status: Option<JobStatus>,
        new_status: Option<JobStatus>,
    ) {
        if old_status.is_some() && old_status == new_status {
            return;
        }

        let mut next = self.queues.get(&queue).copied().unwrap_or_default();
        if let Some(old) = old_status {
            let slot = next.slot_mut(old);
            if *slot == 0 {
                tracing::warn!(
                    queue = %queue,
                    status = %old,
                    "Counter would go negative, clamping at zero"
                );
            } else {
                *slot -= 1;
            }
        }
        if let Some(new) = new_status {
            *next.slot_mut(new) += 1;
        }
        next.recompute_total();
        self.queues.insert(queue, next);
    }

    pub fn get(&self, queue: QueueName) -> QueueCounts {
        self.queues.get(&queue).copied().unwrap_or_default()
    }

    pub fn all(&self) -> QueueStats {
        self.queues.clone()
    }

    /// Summed view over `queues`, computed on every call.
    pub fn aggregate(&self, queues: &[QueueName]) -> QueueCounts {
        let mut sum = QueueCounts::default();
        for queue in queues {
            if let Some(counts) = self.queues.get(queue) {
                sum.add(counts);
            }
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_recomputes_total() {
        let mut store = QueueStatsStore::new();
        let mut counts = QueueCounts::new(1, 2, 3, 4);
        counts.total = 999;
        store.replace_snapshot(QueueName::Ai, counts);
        assert_eq!(store.get(QueueName::Ai).total, 10);
    }

    #[test]
    fn test_delta_moves_job_between_counters() {
        let mut store = QueueStatsStore::new();
        store.replace_snapshot(QueueName::Ai, QueueCounts::new(2, 0, 0, 0));
        store.apply_delta(QueueName::Ai, Some(JobStatus::Pending), Some(JobStatus::Processing));
        let counts = store.get(QueueName::Ai);
        assert_eq!((counts.pending, counts.processing, counts.total), (1, 1, 2));
    }

    #[test]
    fn test_insert_and_delete_deltas() {
        let mut store = QueueStatsStore::new();
        store.apply_delta(QueueName::Video, None, Some(JobStatus::Pending));
        assert_eq!(store.get(QueueName::Video).total, 1);
        store.apply_delta(QueueName::Video, Some(JobStatus::Pending), None);
        assert_eq!(store.get(QueueName::Video), QueueCounts::default());
    }

    #[test]
    fn test_decrement_clamps_at_zero() {
        let mut store = QueueStatsStore::new();
        store.apply_delta(QueueName::Ai, Some(JobStatus::Processing), Some(JobStatus::Completed));
        let counts = store.get(QueueName::Ai);
        assert_eq!(counts.processing, 0);
        assert_eq!(counts.completed, 1);
        assert!(counts.is_consistent());
    }

    #[test]
    fn test_same_status_update_is_noop() {
        let mut store = QueueStatsStore::new();
        store.replace_snapshot(QueueName::Ai, QueueCounts::new(0, 1, 0, 0));
        store.apply_delta(QueueName::Ai, Some(JobStatus::Processing), Some(JobStatus::Processing));
        assert_eq!(store.get(QueueName::Ai), QueueCounts::new(0, 1, 0, 0));
    }

    #[test]
    fn test_poll_overrides_push() {
        let mut store = QueueStatsStore::new();
        for _ in 0..5 {
            store.apply_delta(QueueName::Ai, None, Some(JobStatus::Pending));
        }
        assert_eq!(store.get(QueueName::Ai).pending, 5);
        store.replace_snapshot(QueueName::Ai, QueueCounts::new(3, 0, 0, 0));
        assert_eq!(store.get(QueueName::Ai).pending, 3);
        assert_eq!(store.get(QueueName::Ai).total, 3);
    }

    #[test]
    fn test_total_invariant_over_mixed_sequence() {
        use JobStatus::*;
        let statuses = [Pending, Processing, Completed, Failed];
        let mut store = QueueStatsStore::new();
        for i in 0..200usize {
            let old = if i % 3 == 0 { None } else { Some(statuses[i % 4]) };
            let new = if i % 7 == 0 { None } else { Some(statuses[(i / 2) % 4]) };
            store.apply_delta(QueueName::Ai, old, new);
            if i % 50 == 0 {
                store.replace_snapshot(QueueName::Ai, QueueCounts::new(i as u64, 1, 2, 3));
            }
            assert!(store.get(QueueName::Ai).is_consistent());
        }
    }

    #[test]
    fn test_aggregate_sums_requested_queues() {
        let mut store = QueueStatsStore::new();
        store.replace_snapshot(QueueName::Ai, QueueCounts::new(1, 2, 3, 4));
        store.replace_snapshot(QueueName::Video, QueueCounts::new(10, 0, 5, 0));
        let both = store.aggregate(&QueueName::ALL);
        assert_eq!(both, QueueCounts::new(11, 2, 8, 4));
        assert_eq!(store.aggregate(&[QueueName::Video]).total, 15);

        store.apply_delta(QueueName::Video, Some(JobStatus::Pending), Some(JobStatus::Failed));
        assert_eq!(store.aggregate(&QueueName::ALL).failed, 5);
    }
}
