//! Test doubles for the job store, change feed and AI service.
#![allow(dead_code)]

use album_dashboard::models::batch::BatchResponse;
use album_dashboard::models::job::{ChangeEvent, ChangeKind, Job, JobStatus, QueueName, Worker};
use album_dashboard::models::stats::QueueCounts;
use album_dashboard::models::tag::{ApplyResponse, MatchPair, TagSyncPreview};
use album_dashboard::services::ai_client::{AiServiceError, TagSyncService};
use album_dashboard::services::batch::BatchQueuer;
use album_dashboard::services::change_feed::{ChangeFeed, ChangeStream, FeedError};
use album_dashboard::services::source::{QueueSource, SourceError};
use async_trait::async_trait;
use chrono::Utc;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use uuid::Uuid;

pub fn job(queue: QueueName, status: JobStatus) -> Job {
    Job {
        id: Uuid::new_v4(),
        queue_name: queue,
        status,
        created_at: Utc::now(),
        started_at: None,
        completed_at: None,
        error_message: None,
        worker_id: None,
        payload: serde_json::Value::Null,
    }
}

pub fn insert(job: &Job) -> ChangeEvent {
    ChangeEvent {
        event_type: ChangeKind::Insert,
        queue_name: job.queue_name,
        old: None,
        new: Some(job.clone()),
    }
}

pub fn transition(job: &Job, to: JobStatus) -> ChangeEvent {
    let mut new = job.clone();
    new.status = to;
    ChangeEvent {
        event_type: ChangeKind::Update,
        queue_name: job.queue_name,
        old: Some(job.clone()),
        new: Some(new),
    }
}

#[derive(Default)]
struct SourceState {
    stats: HashMap<QueueName, QueueCounts>,
    jobs: Vec<Job>,
    workers: Vec<Worker>,
    failing: bool,
    stats_calls: usize,
}

/// In-memory job store whose answers tests can change between polls.
#[derive(Default)]
pub struct FakeQueueSource {
    state: Mutex<SourceState>,
}

impl FakeQueueSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stats(&self, queue: QueueName, counts: QueueCounts) {
        self.state.lock().stats.insert(queue, counts);
    }

    pub fn set_jobs(&self, jobs: Vec<Job>) {
        self.state.lock().jobs = jobs;
    }

    pub fn set_workers(&self, workers: Vec<Worker>) {
        self.state.lock().workers = workers;
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    pub fn stats_calls(&self) -> usize {
        self.state.lock().stats_calls
    }

    fn check(&self) -> Result<(), SourceError> {
        if self.state.lock().failing {
            return Err(SourceError::Unavailable("fake source offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl QueueSource for FakeQueueSource {
    async fn stats(&self, queue: QueueName) -> Result<QueueCounts, SourceError> {
        self.check()?;
        let mut state = self.state.lock();
        state.stats_calls += 1;
        Ok(state.stats.get(&queue).copied().unwrap_or_default())
    }

    async fn recent_jobs(&self, queue: QueueName, limit: i64) -> Result<Vec<Job>, SourceError> {
        self.check()?;
        let state = self.state.lock();
        let mut jobs: Vec<Job> = state
            .jobs
            .iter()
            .filter(|j| j.queue_name == queue)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit as usize);
        Ok(jobs)
    }

    async fn active_jobs(&self, queue: QueueName) -> Result<Vec<Job>, SourceError> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .jobs
            .iter()
            .filter(|j| j.queue_name == queue && j.status == JobStatus::Processing)
            .cloned()
            .collect())
    }

    async fn worker_status(&self) -> Result<Vec<Worker>, SourceError> {
        self.check()?;
        Ok(self.state.lock().workers.clone())
    }

    async fn clear_queue(&self, queue: QueueName) -> Result<u64, SourceError> {
        self.check()?;
        let mut state = self.state.lock();
        let before = state.jobs.len();
        state
            .jobs
            .retain(|j| !(j.queue_name == queue && j.status == JobStatus::Pending));
        Ok((before - state.jobs.len()) as u64)
    }
}

/// Change feed driven by the test. Each subscription gets its own channel;
/// `send` delivers to every open subscription for the event's queue.
#[derive(Default)]
pub struct ChannelChangeFeed {
    senders: Mutex<Vec<(QueueName, UnboundedSender<Result<ChangeEvent, FeedError>>)>>,
}

impl ChannelChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribers(&self) -> usize {
        self.senders.lock().len()
    }

    pub fn send(&self, event: ChangeEvent) {
        let mut senders = self.senders.lock();
        senders.retain(|(_, tx)| !tx.is_closed());
        for (queue, tx) in senders.iter() {
            if *queue == event.queue_name {
                let _ = tx.unbounded_send(Ok(event.clone()));
            }
        }
    }

    pub fn fail(&self, queue: QueueName, error: FeedError) {
        let senders = self.senders.lock();
        if let Some((_, tx)) = senders.iter().find(|(q, _)| *q == queue) {
            let _ = tx.unbounded_send(Err(error));
        }
    }
}

#[async_trait]
impl ChangeFeed for ChannelChangeFeed {
    async fn subscribe(&self, queue: QueueName) -> Result<ChangeStream, FeedError> {
        let (tx, rx) = unbounded();
        self.senders.lock().push((queue, tx));
        Ok(rx.boxed())
    }
}

/// Change feed that refuses every subscription.
pub struct RejectingChangeFeed;

#[async_trait]
impl ChangeFeed for RejectingChangeFeed {
    async fn subscribe(&self, _queue: QueueName) -> Result<ChangeStream, FeedError> {
        Err(FeedError::Terminal("subscriptions disabled".to_string()))
    }
}

/// Tag sync endpoint returning a fixed preview and recording applied pairs.
pub struct StubTagService {
    preview: TagSyncPreview,
    applied: Mutex<Vec<Vec<MatchPair>>>,
}

impl StubTagService {
    pub fn new(preview: TagSyncPreview) -> Self {
        Self {
            preview,
            applied: Mutex::new(Vec::new()),
        }
    }

    pub fn applied(&self) -> Vec<Vec<MatchPair>> {
        self.applied.lock().clone()
    }
}

#[async_trait]
impl TagSyncService for StubTagService {
    async fn preview_tag_sync(&self, _iou_threshold: f64, _limit: u32) -> Result<TagSyncPreview, AiServiceError> {
        Ok(self.preview.clone())
    }

    async fn apply_tag_sync(&self, matches: &[MatchPair]) -> Result<ApplyResponse, AiServiceError> {
        self.applied.lock().push(matches.to_vec());
        Ok(ApplyResponse {
            applied: matches.len() as u64,
        })
    }
}

/// Batch endpoint replaying scripted responses; fails once the script runs out.
#[derive(Default)]
pub struct ScriptedQueuer {
    responses: Mutex<VecDeque<Result<BatchResponse, AiServiceError>>>,
    offsets: Mutex<Vec<u64>>,
}

impl ScriptedQueuer {
    pub fn new(responses: Vec<Result<BatchResponse, AiServiceError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            offsets: Mutex::new(Vec::new()),
        }
    }

    pub fn offsets(&self) -> Vec<u64> {
        self.offsets.lock().clone()
    }
}

#[async_trait]
impl BatchQueuer for ScriptedQueuer {
    async fn queue_batch(&self, _batch_size: u32, offset: u64) -> Result<BatchResponse, AiServiceError> {
        self.offsets.lock().push(offset);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(AiServiceError::Unexpected("script exhausted".to_string())))
    }
}

pub fn batch_response(queued: u64, next_offset: u64, remaining: u64) -> BatchResponse {
    BatchResponse {
        queued,
        skipped: 0,
        next_offset,
        done: false,
        remaining: Some(remaining),
        message: None,
    }
}

/// Poll `check` until it holds or the timeout elapses.
pub async fn wait_until<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
