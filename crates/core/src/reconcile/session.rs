//! Reconciliation session: the work list plus the matching and tracking passes.

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{SessionListener, SessionOutcome, SessionPhase};
use super::item::{ItemError, ItemId, MatchedCandidate, WorkItem};
use super::{ReconcileConfig, ReconcileError};
use crate::catalog::{CatalogId, CatalogService};
use crate::library::{EntryKey, LibraryStore, SourceId, TrackingRecord};
use crate::matching::{
    classify, score, score_candidate, MatchError, MatchResult, MatchVerdict, MatchWorker,
    ScoredCandidate,
};
use crate::metrics;
use crate::scheduler::{
    BatchObserver, BatchProgress, BatchScheduler, ItemOutcome, RunSummary, ShutdownSignal,
};

/// A candidate offered for manual re-matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateChoice {
    pub scored: ScoredCandidate,
    pub verdict: MatchVerdict,
    /// The item's current match.
    pub is_current: bool,
}

/// Closes a session from another task.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    shutdown: ShutdownSignal,
}

impl SessionHandle {
    /// Stop scheduling. Work already dispatched finishes and its results are
    /// discarded.
    pub fn close(&self) {
        self.shutdown.trigger();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_triggered()
    }
}

/// One reconciliation of a library snapshot against the catalog.
///
/// Work items are owned here and only mutated between batches, on the task
/// driving the pass.
pub struct ReconciliationSession {
    id: Uuid,
    config: ReconcileConfig,
    catalog: Arc<dyn CatalogService>,
    library: Arc<dyn LibraryStore>,
    listener: Arc<dyn SessionListener>,
    items: Vec<WorkItem>,
    progress: BatchProgress,
    shutdown: ShutdownSignal,
}

impl ReconciliationSession {
    /// Build the work list from the library's untracked entries.
    pub fn open(
        config: ReconcileConfig,
        catalog: Arc<dyn CatalogService>,
        library: Arc<dyn LibraryStore>,
        listener: Arc<dyn SessionListener>,
    ) -> Result<Self, ReconcileError> {
        let entries = library.list_untracked(config.target_source)?;
        let items: Vec<WorkItem> = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| WorkItem::new(ItemId(idx), entry))
            .collect();

        let id = Uuid::new_v4();
        info!(session = %id, "Opened session with {} untracked entries", items.len());

        Ok(Self {
            id,
            progress: BatchProgress::new(0, items.len()),
            config,
            catalog,
            library,
            listener,
            items,
            shutdown: ShutdownSignal::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&WorkItem> {
        self.items.get(id.0)
    }

    /// First item with exactly this title.
    pub fn find_item(&self, title: &str) -> Option<ItemId> {
        self.items.iter().find(|i| i.title == title).map(|i| i.id)
    }

    /// Progress of the most recent pass.
    pub fn progress(&self) -> BatchProgress {
        self.progress
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    pub fn close(&self) {
        if !self.shutdown.is_triggered() {
            info!(session = %self.id, "Closing session");
        }
        self.shutdown.trigger();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_triggered()
    }

    fn ensure_open(&self) -> Result<(), ReconcileError> {
        if self.is_closed() {
            return Err(ReconcileError::SessionClosed);
        }
        Ok(())
    }

    fn item_mut(&mut self, id: ItemId) -> Result<&mut WorkItem, ReconcileError> {
        self.items
            .get_mut(id.0)
            .ok_or(ReconcileError::UnknownItem(id))
    }

    pub fn toggle_selection(&mut self, id: ItemId, selected: bool) -> Result<(), ReconcileError> {
        self.item_mut(id)?.selected = selected;
        Ok(())
    }

    /// Match every item against the catalog.
    ///
    /// All items are reset to Pending first. Per-item failures end up on the
    /// items; the pass itself only fails when the session is closed.
    pub async fn start_matching(&mut self) -> Result<RunSummary, ReconcileError> {
        self.ensure_open()?;
        let total = self.items.len();
        info!(session = %self.id, "Starting matching pass over {} items", total);

        for item in &mut self.items {
            item.reset();
            self.listener.on_item_status_changed(item);
        }
        self.progress = BatchProgress::new(0, total);
        self.listener.on_progress(SessionPhase::Matching, self.progress);

        let worker = MatchWorker::new(Arc::clone(&self.catalog), self.config.search_limit);
        let titles: Vec<String> = self.items.iter().map(|i| i.title.clone()).collect();
        let scheduler = BatchScheduler::new(self.config.matching.clone())
            .with_shutdown(self.shutdown.clone());

        let mut observer = MatchingObserver {
            session: self.id,
            items: &mut self.items,
            listener: self.listener.as_ref(),
            progress: &mut self.progress,
        };

        let summary = scheduler
            .run(
                titles,
                move |title: String| {
                    let worker = worker.clone();
                    async move { worker.match_title(&title).await }
                },
                &mut observer,
            )
            .await;

        info!(
            session = %self.id,
            "Matching pass {}: {}/{} items in {} batches",
            if summary.cancelled { "cancelled" } else { "finished" },
            summary.processed,
            summary.total,
            summary.batches
        );
        Ok(summary)
    }

    /// Commit every selected match, then persist the library.
    ///
    /// Returns `None` without doing anything when nothing is committable.
    /// The session is closed once the pass has run.
    pub async fn track_selected(&mut self) -> Result<Option<SessionOutcome>, ReconcileError> {
        self.ensure_open()?;

        let (targets, jobs): (Vec<usize>, Vec<TrackingJob>) = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_committable())
            .filter_map(|(idx, item)| {
                item.candidate.as_ref().map(|c| {
                    (
                        idx,
                        TrackingJob {
                            key: item.entry.clone(),
                            media_id: c.id,
                        },
                    )
                })
            })
            .unzip();

        if jobs.is_empty() {
            debug!(session = %self.id, "No selected matches to track");
            return Ok(None);
        }

        info!(session = %self.id, "Starting tracking pass over {} items", jobs.len());
        self.progress = BatchProgress::new(0, jobs.len());
        self.listener.on_progress(SessionPhase::Tracking, self.progress);

        let catalog = Arc::clone(&self.catalog);
        let library = Arc::clone(&self.library);
        let source = self.config.target_source;
        let scheduler = BatchScheduler::new(self.config.tracking.clone())
            .with_shutdown(self.shutdown.clone());

        let mut observer = TrackingObserver {
            session: self.id,
            items: &mut self.items,
            targets,
            listener: self.listener.as_ref(),
            progress: &mut self.progress,
            tracked: 0,
            failed: 0,
        };

        let summary = scheduler
            .run(
                jobs,
                move |job: TrackingJob| {
                    let catalog = Arc::clone(&catalog);
                    let library = Arc::clone(&library);
                    async move { commit_tracking(catalog.as_ref(), library.as_ref(), source, job).await }
                },
                &mut observer,
            )
            .await;

        let mut outcome = SessionOutcome {
            tracked: observer.tracked,
            failed: observer.failed,
            persisted: false,
            cancelled: summary.cancelled,
        };

        if summary.cancelled {
            warn!(session = %self.id, "Tracking pass cancelled, library not saved");
            self.listener.on_session_complete(&outcome);
            return Ok(Some(outcome));
        }

        let persisted = self.library.persist();
        self.shutdown.trigger();

        match persisted {
            Ok(()) => {
                outcome.persisted = true;
                info!(
                    session = %self.id,
                    "Tracking pass finished: {} tracked, {} failed",
                    outcome.tracked, outcome.failed
                );
                self.listener.on_session_complete(&outcome);
                Ok(Some(outcome))
            }
            Err(e) => {
                warn!(session = %self.id, "Failed to persist library: {}", e);
                self.listener.on_session_complete(&outcome);
                Err(ReconcileError::PersistenceFailed(e))
            }
        }
    }

    /// Search again for one item with the wider manual limit.
    pub async fn search_candidates(
        &self,
        id: ItemId,
    ) -> Result<Vec<CandidateChoice>, ReconcileError> {
        self.ensure_open()?;
        let item = self.item(id).ok_or(ReconcileError::UnknownItem(id))?;

        let candidates = self
            .catalog
            .search(&item.title, self.config.manual_search_limit)
            .await?;
        let current = item.candidate.as_ref().map(|c| c.id);

        Ok(candidates
            .iter()
            .map(|candidate| {
                let scored = score_candidate(&item.title, candidate);
                CandidateChoice {
                    verdict: classify(scored.score),
                    is_current: current == Some(candidate.id),
                    scored,
                }
            })
            .collect())
    }

    /// Manually accept `candidate` for an item.
    pub fn select_candidate(
        &mut self,
        id: ItemId,
        candidate: MatchedCandidate,
    ) -> Result<(), ReconcileError> {
        self.ensure_open()?;
        let session = self.id;
        let item = self.item_mut(id)?;
        item.select_manual(candidate)?;
        debug!(session = %session, "Manually matched '{}'", item.title);

        let item = &self.items[id.0];
        self.listener.on_item_status_changed(item);
        Ok(())
    }

    /// Manually accept a catalog entry by ID, fetching its title.
    pub async fn select_catalog_id(
        &mut self,
        id: ItemId,
        catalog_id: CatalogId,
    ) -> Result<(), ReconcileError> {
        self.ensure_open()?;
        let title = self
            .item(id)
            .ok_or(ReconcileError::UnknownItem(id))?
            .title
            .clone();

        let details = self.catalog.get_details(catalog_id).await?;
        let candidate = MatchedCandidate {
            id: details.id,
            score: score(&title, &details.title),
            title: details.title,
        };
        self.select_candidate(id, candidate)
    }
}

impl std::fmt::Debug for ReconciliationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationSession")
            .field("id", &self.id)
            .field("items", &self.items.len())
            .field("progress", &self.progress)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Pass observers
// ============================================================================

struct MatchingObserver<'a> {
    session: Uuid,
    items: &'a mut [WorkItem],
    listener: &'a dyn SessionListener,
    progress: &'a mut BatchProgress,
}

impl BatchObserver<Result<MatchResult, MatchError>> for MatchingObserver<'_> {
    fn batch_started(&mut self, range: Range<usize>) {
        for item in &mut self.items[range] {
            if let Err(e) = item.begin() {
                warn!(session = %self.session, "{}", e);
                continue;
            }
            self.listener.on_item_status_changed(item);
        }
    }

    fn batch_finished(
        &mut self,
        outcomes: Vec<(usize, ItemOutcome<Result<MatchResult, MatchError>>)>,
        progress: BatchProgress,
    ) {
        for (idx, outcome) in outcomes {
            let item = &mut self.items[idx];
            let applied = match outcome {
                Ok(Ok(result)) => item.complete(&result),
                Ok(Err(e)) => {
                    warn!(session = %self.session, "Matching '{}' failed: {}", item.title, e);
                    item.fail(&ItemError::SearchFailed(e.to_string()))
                }
                Err(e) => {
                    warn!(session = %self.session, "Matching '{}' failed: {}", item.title, e);
                    item.fail(&ItemError::WorkerPanicked(e.to_string()))
                }
            };

            match applied {
                Ok(()) => self.listener.on_item_status_changed(item),
                Err(e) => warn!(session = %self.session, "{}", e),
            }
        }

        *self.progress = progress;
        self.listener.on_progress(SessionPhase::Matching, progress);
    }
}

struct TrackingJob {
    key: EntryKey,
    media_id: CatalogId,
}

/// Create the remote link, then record it in the library.
async fn commit_tracking(
    catalog: &dyn CatalogService,
    library: &dyn LibraryStore,
    source: SourceId,
    job: TrackingJob,
) -> Result<(), ItemError> {
    catalog
        .add_tracking(job.media_id)
        .await
        .map_err(|e| ItemError::TrackingCommitFailed(e.to_string()))?;

    library
        .append_tracking(&job.key, TrackingRecord::plan_to_read(source, job.media_id))
        .map_err(|e| ItemError::LibraryUpdateFailed(e.to_string()))?;

    debug!("Tracked '{}' as {}", job.key.title, job.media_id);
    Ok(())
}

struct TrackingObserver<'a> {
    session: Uuid,
    items: &'a mut [WorkItem],
    /// Item index for each job.
    targets: Vec<usize>,
    listener: &'a dyn SessionListener,
    progress: &'a mut BatchProgress,
    tracked: usize,
    failed: usize,
}

impl BatchObserver<Result<(), ItemError>> for TrackingObserver<'_> {
    fn batch_finished(
        &mut self,
        outcomes: Vec<(usize, ItemOutcome<Result<(), ItemError>>)>,
        progress: BatchProgress,
    ) {
        for (job, outcome) in outcomes {
            let item = &mut self.items[self.targets[job]];
            let error = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(e) => Some(ItemError::WorkerPanicked(e.to_string())),
            };

            let applied = match error {
                None => {
                    self.tracked += 1;
                    metrics::TRACKING_COMMITS.with_label_values(&["success"]).inc();
                    item.mark_tracked()
                }
                Some(e) => {
                    self.failed += 1;
                    metrics::TRACKING_COMMITS.with_label_values(&["failed"]).inc();
                    warn!(session = %self.session, "Tracking '{}' failed: {}", item.title, e);
                    item.mark_track_failed(&e)
                }
            };

            match applied {
                Ok(()) => self.listener.on_item_status_changed(item),
                Err(e) => warn!(session = %self.session, "{}", e),
            }
        }

        *self.progress = progress;
        self.listener.on_progress(SessionPhase::Tracking, progress);
    }
}
