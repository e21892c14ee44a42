//! Resumable "queue all pending work" runs.
//!
//! Each call to [`BatchCursorController::start`] or
//! [`BatchCursorController::continue_queuing`] submits exactly one batch and
//! then parks the controller in `paused` (or `complete`). Nothing chains
//! batches automatically; an operator looks at queue depth and continues.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::models::batch::{BatchCursor, BatchResponse, BatchSnapshot, BatchState};
use crate::services::ai_client::AiServiceError;

/// External endpoint that queues the next `batch_size` items from `offset`.
#[async_trait]
pub trait BatchQueuer: Send + Sync + 'static {
    async fn queue_batch(&self, batch_size: u32, offset: u64) -> Result<BatchResponse, AiServiceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Cannot {action} while {state}")]
    InvalidState { action: &'static str, state: BatchState },

    #[error("Batch {batch_number} failed: {source}")]
    Transport {
        batch_number: u32,
        #[source]
        source: AiServiceError,
    },
}

#[derive(Debug, Default)]
struct Inner {
    state: BatchState,
    cursor: BatchCursor,
    in_flight: bool,
    generation: u64,
    last_message: Option<String>,
    last_error: Option<String>,
}

/// The batch a caller may submit. Must be taken under the same lock as the
/// state check.
struct Claim {
    offset: u64,
    batch_number: u32,
    generation: u64,
}

impl Claim {
    fn take(inner: &mut Inner) -> Self {
        inner.state = BatchState::Queuing;
        inner.in_flight = true;
        Self {
            offset: inner.cursor.offset,
            batch_number: inner.cursor.batch_number + 1,
            generation: inner.generation,
        }
    }
}

pub struct BatchCursorController {
    queuer: Arc<dyn BatchQueuer>,
    batch_size: u32,
    inner: Mutex<Inner>,
    abort: AtomicBool,
}

impl BatchCursorController {
    pub fn new(queuer: Arc<dyn BatchQueuer>, batch_size: u32) -> Self {
        Self {
            queuer,
            batch_size: batch_size.max(1),
            inner: Mutex::new(Inner::default()),
            abort: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        let inner = self.inner.lock();
        self.snapshot_of(&inner)
    }

    fn snapshot_of(&self, inner: &Inner) -> BatchSnapshot {
        BatchSnapshot {
            state: inner.state,
            cursor: inner.cursor,
            batch_size: self.batch_size,
            last_message: inner.last_message.clone(),
            last_error: inner.last_error.clone(),
        }
    }

    /// Reset the cursor to offset 0 and submit the first batch.
    pub async fn start(&self) -> Result<BatchSnapshot, BatchError> {
        let claim = {
            let mut inner = self.inner.lock();
            if inner.in_flight {
                return Err(BatchError::InvalidState {
                    action: "start",
                    state: inner.state,
                });
            }
            inner.generation += 1;
            inner.cursor = BatchCursor::default();
            inner.last_message = None;
            inner.last_error = None;
            self.abort.store(false, Ordering::SeqCst);
            Claim::take(&mut inner)
        };
        tracing::info!(batch_size = self.batch_size, "Starting batch queue run");
        self.submit(claim).await
    }

    /// Submit the next batch from the held cursor. Only valid while paused.
    pub async fn continue_queuing(&self) -> Result<BatchSnapshot, BatchError> {
        let claim = {
            let mut inner = self.inner.lock();
            if inner.state != BatchState::Paused || inner.in_flight {
                return Err(BatchError::InvalidState {
                    action: "continue",
                    state: inner.state,
                });
            }
            if self.abort.load(Ordering::SeqCst) {
                inner.state = BatchState::Stopped;
                return Ok(self.snapshot_of(&inner));
            }
            Claim::take(&mut inner)
        };
        self.submit(claim).await
    }

    /// Stop after the batch in flight, if any. Queued work is not rolled back.
    pub fn stop(&self) -> BatchSnapshot {
        self.abort.store(true, Ordering::SeqCst);
        let mut inner = self.inner.lock();
        if !inner.in_flight && matches!(inner.state, BatchState::Paused | BatchState::Queuing) {
            inner.state = BatchState::Stopped;
        }
        tracing::info!(state = %inner.state, offset = inner.cursor.offset, "Batch queue run stop requested");
        self.snapshot_of(&inner)
    }

    /// Drop the cursor and return to idle. A batch still in flight finishes
    /// on the server but its result is discarded here.
    pub fn reset(&self) -> BatchSnapshot {
        self.abort.store(true, Ordering::SeqCst);
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.state = BatchState::Idle;
        inner.cursor = BatchCursor::default();
        inner.in_flight = false;
        inner.last_message = None;
        inner.last_error = None;
        self.snapshot_of(&inner)
    }

    async fn submit(&self, claim: Claim) -> Result<BatchSnapshot, BatchError> {
        let Claim {
            offset,
            batch_number,
            generation,
        } = claim;

        tracing::info!(offset, batch_number, batch_size = self.batch_size, "Submitting batch");
        let result = self.queuer.queue_batch(self.batch_size, offset).await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            tracing::info!(batch_number, "Discarding batch result after reset");
            return Ok(self.snapshot_of(&inner));
        }
        inner.in_flight = false;
        let aborted = self.abort.load(Ordering::SeqCst);

        match result {
            Ok(response) => {
                metrics::counter!("batch_submissions_total").increment(1);
                inner.cursor.batch_number = batch_number;
                inner.cursor.total_queued += response.queued;
                inner.cursor.total_skipped += response.skipped;
                inner.cursor.offset = response.next_offset;
                inner.last_message = response.message.clone();
                inner.last_error = None;

                inner.cursor.done = response.is_complete();
                inner.state = if inner.cursor.done {
                    BatchState::Complete
                } else if aborted {
                    BatchState::Stopped
                } else {
                    BatchState::Paused
                };

                tracing::info!(
                    batch_number,
                    queued = response.queued,
                    skipped = response.skipped,
                    next_offset = response.next_offset,
                    state = %inner.state,
                    "Batch submitted"
                );
                Ok(self.snapshot_of(&inner))
            }
            Err(e) => {
                metrics::counter!("batch_failures_total").increment(1);
                tracing::error!(batch_number, offset, error = %e, "Batch submission failed");
                inner.last_error = Some(e.to_string());
                inner.state = if aborted {
                    BatchState::Stopped
                } else {
                    BatchState::Paused
                };
                Err(BatchError::Transport {
                    batch_number,
                    source: e,
                })
            }
        }
    }
}
