//! Tick-driven batch scheduler.
//!
//! Items are cut into consecutive fixed-size batches. Every tick the current
//! batch is dispatched to a worker pool bounded by a semaphore, and the
//! scheduler waits for the whole batch before reporting progress and
//! scheduling the next tick. At most `batch_size` items are in flight and at
//! most `worker_count` of them execute at once.

mod types;

pub use types::{BatchError, BatchPolicy, BatchProgress, ItemOutcome, RunSummary, ShutdownSignal};

use std::future::Future;
use std::ops::Range;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::debug;

/// Receives batch lifecycle callbacks on the coordinating task.
pub trait BatchObserver<O> {
    /// Called right before the items in `range` are dispatched.
    fn batch_started(&mut self, _range: Range<usize>) {}

    /// Called once every item of a batch has finished, with outcomes in item
    /// order and cumulative progress.
    fn batch_finished(&mut self, outcomes: Vec<(usize, ItemOutcome<O>)>, progress: BatchProgress);

    /// Called once when the run ends, whether it completed or was cancelled.
    fn completed(&mut self, _summary: &RunSummary) {}
}

/// Drives batches of deferred work at a fixed cadence.
pub struct BatchScheduler {
    policy: BatchPolicy,
    workers: Arc<Semaphore>,
    shutdown: ShutdownSignal,
}

impl BatchScheduler {
    /// Create a scheduler with its own shutdown signal.
    pub fn new(policy: BatchPolicy) -> Self {
        let workers = Arc::new(Semaphore::new(policy.worker_count.max(1)));
        Self {
            policy,
            workers,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Stop scheduling when `signal` is triggered.
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = signal;
        self
    }

    pub fn policy(&self) -> &BatchPolicy {
        &self.policy
    }

    /// Process `items` with `per_item`, reporting to `observer`.
    ///
    /// Once the shutdown signal fires no further batch is dispatched, and the
    /// outcomes of a batch still in flight are discarded when it finishes.
    pub async fn run<T, O, F, Fut, Obs>(
        &self,
        items: Vec<T>,
        per_item: F,
        observer: &mut Obs,
    ) -> RunSummary
    where
        T: Send + 'static,
        O: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        Obs: BatchObserver<O> + ?Sized,
    {
        let total = items.len();
        let started_at = Utc::now();
        let batch_size = self.policy.batch_size.max(1);
        let per_item = Arc::new(per_item);
        let mut shutdown_rx = self.shutdown.subscribe();

        let mut processed = 0;
        let mut batches = 0;
        let mut cancelled = false;
        let mut remaining = items.into_iter().enumerate().peekable();

        while remaining.peek().is_some() {
            if self.shutdown.is_triggered() {
                cancelled = true;
                break;
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    cancelled = true;
                    break;
                }
                _ = tokio::time::sleep(self.policy.tick_interval) => {}
            }

            let batch: Vec<(usize, T)> = remaining.by_ref().take(batch_size).collect();
            let range = processed..processed + batch.len();
            debug!("Dispatching batch {} (items {:?} of {})", batches + 1, range, total);
            observer.batch_started(range);

            let (indices, handles): (Vec<usize>, Vec<_>) = batch
                .into_iter()
                .map(|(idx, item)| {
                    let per_item = Arc::clone(&per_item);
                    let workers = Arc::clone(&self.workers);
                    let handle = tokio::spawn(async move {
                        let _permit = workers.acquire_owned().await;
                        per_item(item).await
                    });
                    (idx, handle)
                })
                .unzip();

            let results = join_all(handles).await;

            if self.shutdown.is_triggered() {
                debug!("Shutdown during batch {}, discarding {} results", batches + 1, results.len());
                cancelled = true;
                break;
            }

            processed += results.len();
            batches += 1;

            let outcomes = indices
                .into_iter()
                .zip(results)
                .map(|(idx, result)| {
                    (idx, result.map_err(|e| BatchError::WorkerFailed(e.to_string())))
                })
                .collect();
            observer.batch_finished(outcomes, BatchProgress::new(processed, total));
        }

        let summary = RunSummary {
            total,
            processed,
            batches,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        };
        observer.completed(&summary);
        summary
    }
}
