//! Merges the push channel (change events) and the poll channel (full
//! refetch) into one dashboard view.
//!
//! Push listeners, the poll task and dashboard mutators are producers into a
//! single mpsc channel. One consumer task applies every message in arrival
//! order and is the only writer of [`ReconciledView`]; readers take copies
//! through a read lock. Poll snapshots replace counters outright, so every
//! tick corrects whatever drift the best-effort push channel introduced.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

use crate::models::activity::{ActivityLogItem, NewActivity};
use crate::models::job::{ChangeEvent, ChangeKind, Job, QueueName, Worker};
use crate::models::stats::{QueueCounts, QueueStats};
use crate::services::activity_log::ActivityLogBuffer;
use crate::services::change_feed::{ChangeFeed, FeedError};
use crate::services::source::{QueueSource, SourceError};
use crate::services::stats_store::QueueStatsStore;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub queues: Vec<QueueName>,
    pub poll_interval: Duration,
    pub recent_jobs_limit: i64,
    pub activity_capacity: usize,
    pub push_reconnect_delay: Duration,
    pub push_max_reconnects: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            queues: QueueName::ALL.to_vec(),
            poll_interval: Duration::from_secs(30),
            recent_jobs_limit: 50,
            activity_capacity: crate::services::activity_log::DEFAULT_CAPACITY,
            push_reconnect_delay: Duration::from_secs(2),
            push_max_reconnects: 5,
        }
    }
}

/// Everything one poll fetched. Applied all at once or not at all.
#[derive(Debug, Clone, Default)]
pub struct PollSnapshot {
    pub stats: Vec<(QueueName, QueueCounts)>,
    pub recent_jobs: Vec<Job>,
    pub workers: Vec<Worker>,
}

#[derive(Debug, Clone, Default)]
pub struct ActiveSnapshot {
    pub jobs: Vec<Job>,
    pub workers: Vec<Worker>,
}

#[derive(Debug)]
pub enum ReconcilerMsg {
    Push(ChangeEvent),
    PushUnavailable { queue: QueueName, reason: String },
    Poll(PollSnapshot),
    PollFailed(String),
    ActiveRefreshed(ActiveSnapshot),
    ActiveRefreshFailed(String),
    /// Log controls. The sender is signalled once the change is applied.
    Pause(oneshot::Sender<()>),
    Resume(oneshot::Sender<()>),
    ClearLog(oneshot::Sender<()>),
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcilerStatus {
    pub paused: bool,
    pub realtime_unavailable: bool,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_poll_error: Option<String>,
    pub activity_len: usize,
}

/// The reconciled dashboard state.
#[derive(Debug, Clone)]
pub struct ReconciledView {
    stats: QueueStatsStore,
    activity: ActivityLogBuffer,
    recent_jobs: Vec<Job>,
    active_jobs: Vec<Job>,
    workers: Vec<Worker>,
    seeded: bool,
    realtime_unavailable: bool,
    last_poll_at: Option<DateTime<Utc>>,
    last_poll_error: Option<String>,
}

impl ReconciledView {
    pub fn new(activity_capacity: usize) -> Self {
        Self {
            stats: QueueStatsStore::new(),
            activity: ActivityLogBuffer::with_capacity(activity_capacity),
            recent_jobs: Vec::new(),
            active_jobs: Vec::new(),
            workers: Vec::new(),
            seeded: false,
            realtime_unavailable: false,
            last_poll_at: None,
            last_poll_error: None,
        }
    }

    /// Apply one change event. Counters are updated even while the activity
    /// log is paused. Returns whether the event was recorded in the log.
    pub fn apply_push(&mut self, event: &ChangeEvent) -> bool {
        let Some(row) = event.row() else {
            tracing::warn!(queue = %event.queue_name, "Change event without a row image, ignoring");
            return false;
        };

        let logged = self.activity.append(NewActivity {
            timestamp: match event.event_type {
                ChangeKind::Delete => Utc::now(),
                _ => row.last_activity_at(),
            },
            status: row.status,
            event_type: Some(event.event_type),
            job_id: row.id,
            queue_name: event.queue_name,
            worker_id: row.worker_id.clone(),
            result_summary: row.result_summary(),
        });

        self.stats
            .apply_delta(event.queue_name, event.old_status(), event.new_status());
        logged
    }

    pub fn apply_poll(&mut self, snapshot: PollSnapshot) {
        for (queue, counts) in snapshot.stats {
            self.stats.replace_snapshot(queue, counts);
        }

        if !self.seeded {
            // Oldest first so the newest job ends up at the head of the feed.
            for job in snapshot.recent_jobs.iter().rev() {
                self.activity.append(NewActivity {
                    timestamp: job.last_activity_at(),
                    status: job.status,
                    event_type: None,
                    job_id: job.id,
                    queue_name: job.queue_name,
                    worker_id: job.worker_id.clone(),
                    result_summary: job.result_summary(),
                });
            }
            self.seeded = true;
        }

        self.recent_jobs = snapshot.recent_jobs;
        self.workers = snapshot.workers;
        self.last_poll_at = Some(Utc::now());
        self.last_poll_error = None;
    }

    pub fn apply_active(&mut self, active: ActiveSnapshot) {
        self.active_jobs = active.jobs;
        self.workers = active.workers;
    }

    pub fn record_poll_failure(&mut self, reason: String) {
        self.last_poll_error = Some(reason);
    }

    pub fn mark_realtime_unavailable(&mut self) {
        self.realtime_unavailable = true;
    }

    pub fn pause(&mut self) {
        self.activity.pause();
    }

    pub fn resume(&mut self) {
        self.activity.resume();
    }

    pub fn clear_log(&mut self) {
        self.activity.clear();
    }

    pub fn stats(&self) -> &QueueStatsStore {
        &self.stats
    }

    pub fn activity(&self) -> &ActivityLogBuffer {
        &self.activity
    }

    pub fn recent_jobs(&self) -> &[Job] {
        &self.recent_jobs
    }

    pub fn active_jobs(&self) -> &[Job] {
        &self.active_jobs
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn status(&self) -> ReconcilerStatus {
        ReconcilerStatus {
            paused: self.activity.is_paused(),
            realtime_unavailable: self.realtime_unavailable,
            last_poll_at: self.last_poll_at,
            last_poll_error: self.last_poll_error.clone(),
            activity_len: self.activity.len(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcilerError {
    #[error("Reconciler loop has stopped")]
    Stopped,
}

/// Aborts the background tasks when the last handle goes away.
struct TaskGuard(Vec<AbortHandle>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Handle to a running reconciler.
#[derive(Clone)]
pub struct Reconciler {
    tx: mpsc::Sender<ReconcilerMsg>,
    view: Arc<RwLock<ReconciledView>>,
    poll_trigger: Arc<Notify>,
    queues: Arc<[QueueName]>,
    _tasks: Arc<TaskGuard>,
}

impl Reconciler {
    /// Start the consumer loop, the poll task and one push listener per
    /// queue. Without a change feed the reconciler runs on polling alone.
    pub fn spawn(
        config: ReconcilerConfig,
        source: Arc<dyn QueueSource>,
        feed: Option<Arc<dyn ChangeFeed>>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let view = Arc::new(RwLock::new(ReconciledView::new(config.activity_capacity)));
        let poll_trigger = Arc::new(Notify::new());
        let queues: Arc<[QueueName]> = config.queues.clone().into();
        let mut tasks = Vec::new();

        tasks.push(
            tokio::spawn(run_loop(
                rx,
                tx.downgrade(),
                Arc::clone(&view),
                Arc::clone(&source),
                Arc::clone(&queues),
            ))
            .abort_handle(),
        );

        tasks.push(
            tokio::spawn(poll_loop(
                tx.clone(),
                Arc::clone(&source),
                Arc::clone(&queues),
                config.recent_jobs_limit,
                config.poll_interval,
                Arc::clone(&poll_trigger),
            ))
            .abort_handle(),
        );

        match feed {
            Some(feed) => {
                for &queue in queues.iter() {
                    tasks.push(
                        tokio::spawn(push_listener(
                            tx.clone(),
                            Arc::clone(&feed),
                            queue,
                            config.push_reconnect_delay,
                            config.push_max_reconnects,
                        ))
                        .abort_handle(),
                    );
                }
            }
            None => {
                tracing::warn!("No change feed configured, running on polling only");
                view.write().mark_realtime_unavailable();
            }
        }

        Self {
            tx,
            view,
            poll_trigger,
            queues,
            _tasks: Arc::new(TaskGuard(tasks)),
        }
    }

    pub fn queues(&self) -> &[QueueName] {
        &self.queues
    }

    /// Run a poll now instead of waiting for the next tick.
    pub fn refresh(&self) {
        self.poll_trigger.notify_one();
    }

    /// Returns once the consumer has applied the pause.
    pub async fn pause(&self) -> Result<(), ReconcilerError> {
        self.request(ReconcilerMsg::Pause).await
    }

    pub async fn resume(&self) -> Result<(), ReconcilerError> {
        self.request(ReconcilerMsg::Resume).await
    }

    pub async fn clear_log(&self) -> Result<(), ReconcilerError> {
        self.request(ReconcilerMsg::ClearLog).await
    }

    async fn request(
        &self,
        msg: impl FnOnce(oneshot::Sender<()>) -> ReconcilerMsg,
    ) -> Result<(), ReconcilerError> {
        let (ack, applied) = oneshot::channel();
        self.tx.send(msg(ack)).await.map_err(|_| ReconcilerError::Stopped)?;
        applied.await.map_err(|_| ReconcilerError::Stopped)
    }

    pub fn stats(&self) -> QueueStats {
        self.view.read().stats().all()
    }

    pub fn aggregate(&self, queues: &[QueueName]) -> QueueCounts {
        self.view.read().stats().aggregate(queues)
    }

    pub fn recent_jobs(&self) -> Vec<Job> {
        self.view.read().recent_jobs().to_vec()
    }

    pub fn active_jobs(&self) -> Vec<Job> {
        self.view.read().active_jobs().to_vec()
    }

    pub fn workers(&self) -> Vec<Worker> {
        self.view.read().workers().to_vec()
    }

    /// Up to `limit` activity items, newest first.
    pub fn activity(&self, limit: usize) -> Vec<ActivityLogItem> {
        self.view.read().activity().recent(limit)
    }

    pub fn status(&self) -> ReconcilerStatus {
        self.view.read().status()
    }
}

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    pending: bool,
}

async fn run_loop(
    mut rx: mpsc::Receiver<ReconcilerMsg>,
    tx: mpsc::WeakSender<ReconcilerMsg>,
    view: Arc<RwLock<ReconciledView>>,
    source: Arc<dyn QueueSource>,
    queues: Arc<[QueueName]>,
) {
    let mut refresh = RefreshState::default();

    while let Some(msg) = rx.recv().await {
        match msg {
            ReconcilerMsg::Push(event) => {
                metrics::counter!("queue_push_events_total", "queue" => event.queue_name.to_string())
                    .increment(1);
                view.write().apply_push(&event);

                if refresh.in_flight {
                    refresh.pending = true;
                } else {
                    refresh.in_flight = spawn_active_refresh(&tx, &source, &queues);
                }
            }
            ReconcilerMsg::PushUnavailable { queue, reason } => {
                tracing::warn!(
                    queue = %queue,
                    reason = %reason,
                    "Real-time updates unavailable, continuing with polling only"
                );
                view.write().mark_realtime_unavailable();
            }
            ReconcilerMsg::Poll(snapshot) => {
                metrics::counter!("queue_poll_ticks_total").increment(1);
                view.write().apply_poll(snapshot);
            }
            ReconcilerMsg::PollFailed(reason) => {
                metrics::counter!("queue_poll_failures_total").increment(1);
                tracing::warn!(error = %reason, "Poll failed, will retry on next tick");
                view.write().record_poll_failure(reason);
            }
            ReconcilerMsg::ActiveRefreshed(active) => {
                view.write().apply_active(active);
                refresh.in_flight = false;
                if refresh.pending {
                    refresh.pending = false;
                    refresh.in_flight = spawn_active_refresh(&tx, &source, &queues);
                }
            }
            ReconcilerMsg::ActiveRefreshFailed(reason) => {
                tracing::warn!(error = %reason, "Active job refresh failed");
                refresh.in_flight = false;
                if refresh.pending {
                    refresh.pending = false;
                    refresh.in_flight = spawn_active_refresh(&tx, &source, &queues);
                }
            }
            ReconcilerMsg::Pause(ack) => {
                tracing::info!("Activity log paused");
                view.write().pause();
                let _ = ack.send(());
            }
            ReconcilerMsg::Resume(ack) => {
                tracing::info!("Activity log resumed");
                view.write().resume();
                let _ = ack.send(());
            }
            ReconcilerMsg::ClearLog(ack) => {
                view.write().clear_log();
                let _ = ack.send(());
            }
        }
    }

    tracing::debug!("Reconciler loop exiting");
}

fn spawn_active_refresh(
    tx: &mpsc::WeakSender<ReconcilerMsg>,
    source: &Arc<dyn QueueSource>,
    queues: &Arc<[QueueName]>,
) -> bool {
    let Some(tx) = tx.upgrade() else {
        return false;
    };
    let source = Arc::clone(source);
    let queues = Arc::clone(queues);
    tokio::spawn(async move {
        let msg = match fetch_active_snapshot(source.as_ref(), &queues).await {
            Ok(active) => ReconcilerMsg::ActiveRefreshed(active),
            Err(e) => ReconcilerMsg::ActiveRefreshFailed(e.to_string()),
        };
        let _ = tx.send(msg).await;
    });
    true
}

pub async fn fetch_active_snapshot(
    source: &dyn QueueSource,
    queues: &[QueueName],
) -> Result<ActiveSnapshot, SourceError> {
    let mut jobs = Vec::new();
    for &queue in queues {
        jobs.extend(source.active_jobs(queue).await?);
    }
    let workers = source.worker_status().await?;
    Ok(ActiveSnapshot { jobs, workers })
}

/// Fetch stats, recent jobs and workers for every queue. Any failure fails
/// the whole poll.
pub async fn fetch_poll_snapshot(
    source: &dyn QueueSource,
    queues: &[QueueName],
    recent_jobs_limit: i64,
) -> Result<PollSnapshot, SourceError> {
    let mut snapshot = PollSnapshot::default();
    for &queue in queues {
        snapshot.stats.push((queue, source.stats(queue).await?));
        snapshot
            .recent_jobs
            .extend(source.recent_jobs(queue, recent_jobs_limit).await?);
    }
    snapshot
        .recent_jobs
        .sort_by(|a, b| b.created_at.cmp(&a.created_at));
    snapshot
        .recent_jobs
        .truncate(usize::try_from(recent_jobs_limit).unwrap_or(0));
    snapshot.workers = source.worker_status().await?;
    Ok(snapshot)
}

async fn poll_loop(
    tx: mpsc::Sender<ReconcilerMsg>,
    source: Arc<dyn QueueSource>,
    queues: Arc<[QueueName]>,
    recent_jobs_limit: i64,
    interval: Duration,
    trigger: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = trigger.notified() => {}
        }

        let msg = match fetch_poll_snapshot(source.as_ref(), &queues, recent_jobs_limit).await {
            Ok(snapshot) => ReconcilerMsg::Poll(snapshot),
            Err(e) => ReconcilerMsg::PollFailed(e.to_string()),
        };
        if tx.send(msg).await.is_err() {
            break;
        }
    }
}

async fn push_listener(
    tx: mpsc::Sender<ReconcilerMsg>,
    feed: Arc<dyn ChangeFeed>,
    queue: QueueName,
    reconnect_delay: Duration,
    max_reconnects: u32,
) {
    let mut attempts = 0u32;

    loop {
        match feed.subscribe(queue).await {
            Ok(mut stream) => {
                attempts = 0;
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(event) => {
                            if tx.send(ReconcilerMsg::Push(event)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) if e.is_terminal() => {
                            report_unavailable(&tx, queue, e.to_string()).await;
                            return;
                        }
                        Err(FeedError::Malformed(e)) => {
                            tracing::warn!(queue = %queue, error = %e, "Skipping malformed change event");
                        }
                        Err(e) => {
                            tracing::warn!(queue = %queue, error = %e, "Change feed error, reconnecting");
                            break;
                        }
                    }
                }
                tracing::warn!(queue = %queue, "Change feed disconnected");
            }
            Err(e) if e.is_terminal() => {
                report_unavailable(&tx, queue, e.to_string()).await;
                return;
            }
            Err(e) => {
                tracing::warn!(queue = %queue, error = %e, "Change feed subscribe failed");
            }
        }

        attempts += 1;
        if attempts > max_reconnects {
            report_unavailable(
                &tx,
                queue,
                format!("gave up after {} reconnect attempts", max_reconnects),
            )
            .await;
            return;
        }
        tokio::time::sleep(reconnect_delay).await;
    }
}

async fn report_unavailable(tx: &mpsc::Sender<ReconcilerMsg>, queue: QueueName, reason: String) {
    let _ = tx
        .send(ReconcilerMsg::PushUnavailable { queue, reason })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobStatus;
    use uuid::Uuid;

    fn job(queue: QueueName, status: JobStatus) -> Job {
        Job {
            id: Uuid::new_v4(),
            queue_name: queue,
            status,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
            worker_id: Some("worker-a".to_string()),
            payload: serde_json::Value::Null,
        }
    }

    fn transition(queue: QueueName, from: JobStatus, to: JobStatus) -> ChangeEvent {
        let old = job(queue, from);
        let mut new = old.clone();
        new.status = to;
        ChangeEvent {
            event_type: ChangeKind::Update,
            queue_name: queue,
            old: Some(old),
            new: Some(new),
        }
    }

    fn insert(queue: QueueName) -> ChangeEvent {
        ChangeEvent {
            event_type: ChangeKind::Insert,
            queue_name: queue,
            old: None,
            new: Some(job(queue, JobStatus::Pending)),
        }
    }

    #[test]
    fn test_push_updates_counters_and_log() {
        let mut view = ReconciledView::new(10);
        assert!(view.apply_push(&insert(QueueName::Ai)));
        assert!(view.apply_push(&transition(QueueName::Ai, JobStatus::Pending, JobStatus::Processing)));

        let counts = view.stats().get(QueueName::Ai);
        assert_eq!((counts.pending, counts.processing, counts.total), (0, 1, 1));
        assert_eq!(view.activity().len(), 2);
    }

    #[test]
    fn test_paused_push_still_counts() {
        let mut view = ReconciledView::new(10);
        view.pause();
        assert!(!view.apply_push(&insert(QueueName::Video)));
        assert_eq!(view.stats().get(QueueName::Video).pending, 1);
        assert!(view.activity().is_empty());

        view.resume();
        assert!(view.apply_push(&insert(QueueName::Video)));
        assert_eq!(view.activity().len(), 1);
        assert_eq!(view.stats().get(QueueName::Video).pending, 2);
    }

    #[test]
    fn test_delete_decrements_old_status() {
        let mut view = ReconciledView::new(10);
        view.apply_poll(PollSnapshot {
            stats: vec![(QueueName::Ai, QueueCounts::new(0, 0, 0, 1))],
            ..Default::default()
        });
        let failed = job(QueueName::Ai, JobStatus::Failed);
        view.apply_push(&ChangeEvent {
            event_type: ChangeKind::Delete,
            queue_name: QueueName::Ai,
            old: Some(failed),
            new: None,
        });
        assert_eq!(view.stats().get(QueueName::Ai), QueueCounts::default());
    }

    #[test]
    fn test_event_without_row_is_ignored() {
        let mut view = ReconciledView::new(10);
        let logged = view.apply_push(&ChangeEvent {
            event_type: ChangeKind::Update,
            queue_name: QueueName::Ai,
            old: None,
            new: None,
        });
        assert!(!logged);
        assert_eq!(view.stats().get(QueueName::Ai).total, 0);
    }

    #[test]
    fn test_poll_replaces_push_drift() {
        let mut view = ReconciledView::new(10);
        for _ in 0..5 {
            view.apply_push(&insert(QueueName::Ai));
        }
        assert_eq!(view.stats().get(QueueName::Ai).pending, 5);

        view.apply_poll(PollSnapshot {
            stats: vec![(QueueName::Ai, QueueCounts::new(3, 0, 0, 0))],
            ..Default::default()
        });
        let counts = view.stats().get(QueueName::Ai);
        assert_eq!(counts.pending, 3);
        assert_eq!(counts.total, 3);
    }

    #[test]
    fn test_first_poll_seeds_log_once() {
        let mut view = ReconciledView::new(10);
        let newest = job(QueueName::Ai, JobStatus::Completed);
        let older = job(QueueName::Video, JobStatus::Failed);
        let snapshot = PollSnapshot {
            stats: vec![],
            recent_jobs: vec![newest.clone(), older.clone()],
            workers: vec![],
        };

        view.apply_poll(snapshot.clone());
        let feed = view.activity().recent(10);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].job_id, newest.id);
        assert_eq!(feed[0].event_type, None);

        view.apply_poll(snapshot);
        assert_eq!(view.activity().len(), 2);
        assert_eq!(view.recent_jobs().len(), 2);
    }

    #[test]
    fn test_status_reflects_flags() {
        let mut view = ReconciledView::new(10);
        view.record_poll_failure("connection reset".to_string());
        view.mark_realtime_unavailable();
        view.pause();
        let status = view.status();
        assert!(status.paused);
        assert!(status.realtime_unavailable);
        assert_eq!(status.last_poll_error.as_deref(), Some("connection reset"));

        view.apply_poll(PollSnapshot::default());
        assert!(view.status().last_poll_error.is_none());
        assert!(view.status().last_poll_at.is_some());
    }
}
