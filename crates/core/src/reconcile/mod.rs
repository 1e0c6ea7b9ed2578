//! Batch reconciliation of untracked library entries against the catalog.
//!
//! A [`ReconciliationSession`] owns one [`WorkItem`] per untracked entry. The
//! matching pass searches and classifies every item; the tracking pass
//! commits the selected matches to the catalog and the library, then
//! persists the library once.

mod events;
mod item;
mod session;

pub use events::{
    ChannelListener, NoopListener, SessionEvent, SessionListener, SessionOutcome, SessionPhase,
};
pub use item::{
    ItemError, ItemId, MatchStatus, MatchedCandidate, TransitionError, WorkItem,
    TRACKED_LABEL, TRACK_ERROR_LABEL,
};
pub use session::{CandidateChoice, ReconciliationSession, SessionHandle};

use std::time::Duration;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::Config;
use crate::library::{LibraryError, SourceId, MYANIMELIST_SOURCE};
use crate::matching::DEFAULT_SEARCH_LIMIT;
use crate::scheduler::BatchPolicy;

/// Session-level failures. Per-item failures are recorded on the items.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Failed to persist library: {0}")]
    PersistenceFailed(#[source] LibraryError),

    #[error("Session is closed")]
    SessionClosed,

    #[error("Unknown item {0}")]
    UnknownItem(ItemId),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Engine settings for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileConfig {
    pub matching: BatchPolicy,
    pub tracking: BatchPolicy,
    /// Candidates requested per title in the matching pass.
    pub search_limit: u32,
    /// Candidates requested by `search_candidates`.
    pub manual_search_limit: u32,
    /// Tracker whose links are reconciled.
    pub target_source: SourceId,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            matching: BatchPolicy {
                batch_size: 1,
                worker_count: 1,
                tick_interval: Duration::from_millis(2000),
            },
            tracking: BatchPolicy {
                batch_size: 10,
                worker_count: 1,
                tick_interval: Duration::from_millis(800),
            },
            search_limit: DEFAULT_SEARCH_LIMIT,
            manual_search_limit: 15,
            target_source: MYANIMELIST_SOURCE,
        }
    }
}

impl ReconcileConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            matching: config.matching.policy(),
            tracking: config.tracking.policy(),
            search_limit: config.matching.search_limit,
            manual_search_limit: config.matching.manual_search_limit,
            target_source: config.library.target_source_id,
        }
    }

    /// Use the same tick interval for both passes.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.matching.tick_interval = interval;
        self.tracking.tick_interval = interval;
        self
    }
}
