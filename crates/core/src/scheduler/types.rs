//! Types for the batch scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// Batching and concurrency limits for one kind of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Items dispatched per tick.
    pub batch_size: usize,
    /// Items executing at the same time.
    pub worker_count: usize,
    /// Delay before each batch.
    pub tick_interval: Duration,
}

/// Cumulative progress of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub done: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn new(done: usize, total: usize) -> Self {
        Self { done, total }
    }

    /// Completion in percent, 100 for an empty run.
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            100.0
        } else {
            self.done as f32 / self.total as f32 * 100.0
        }
    }
}

/// Failure of a worker task itself (not of the work it performed).
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("worker task failed: {0}")]
    WorkerFailed(String),
}

/// Outcome of one item as seen by the coordinator.
pub type ItemOutcome<O> = Result<O, BatchError>;

/// Summary of a finished or cancelled run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    /// Items whose outcomes were delivered.
    pub processed: usize,
    pub batches: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn progress(&self) -> BatchProgress {
        BatchProgress::new(self.processed, self.total)
    }
}

/// Cloneable stop signal shared between a session and its schedulers.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    tx: broadcast::Sender<()>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            tx,
        }
    }

    /// Fire the signal. Idempotent.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(());
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}
