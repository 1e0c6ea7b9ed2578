//! Work items and their state machine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogId;
use crate::library::{EntryKey, LibraryEntry};
use crate::matching::{MatchResult, MatchVerdict, ScoredCandidate};

/// Position of an item in the session's work list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub usize);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Matching state of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    InProgress,
    Matched,
    FuzzyMatched,
    NoMatch,
    Error,
}

impl MatchStatus {
    /// Terminal for the current pass.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MatchStatus::Matched | MatchStatus::FuzzyMatched | MatchStatus::NoMatch | MatchStatus::Error
        )
    }

    /// Whether the item carries an accepted candidate.
    pub fn is_match(&self) -> bool {
        matches!(self, MatchStatus::Matched | MatchStatus::FuzzyMatched)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Matched => "matched",
            MatchStatus::FuzzyMatched => "fuzzy_matched",
            MatchStatus::NoMatch => "no_match",
            MatchStatus::Error => "error",
        }
    }

    /// Default display label.
    pub fn label(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "Pending",
            MatchStatus::InProgress => "Searching...",
            MatchStatus::Matched => "Matched",
            MatchStatus::FuzzyMatched => "Fuzzy Match",
            MatchStatus::NoMatch => "No Match",
            MatchStatus::Error => "Error",
        }
    }

    /// Display colour as RGBA.
    pub fn colour(&self) -> [f32; 4] {
        match self {
            MatchStatus::Pending => [0.7, 0.7, 0.7, 1.0],
            MatchStatus::InProgress => [1.0, 0.76, 0.03, 1.0],
            MatchStatus::Matched => [0.2, 0.8, 0.2, 1.0],
            MatchStatus::FuzzyMatched => [0.6, 0.2, 0.8, 1.0],
            MatchStatus::NoMatch | MatchStatus::Error => [0.8, 0.2, 0.2, 1.0],
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const TRACKED_LABEL: &str = "Tracked";
pub const TRACK_ERROR_LABEL: &str = "Track Error";

/// The catalog entry accepted for an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedCandidate {
    pub id: CatalogId,
    pub title: String,
    pub score: u8,
}

impl From<&ScoredCandidate> for MatchedCandidate {
    fn from(scored: &ScoredCandidate) -> Self {
        MatchedCandidate {
            id: scored.candidate.id,
            title: scored.candidate.title.clone(),
            score: scored.score,
        }
    }
}

/// Per-item failure, recorded on the item and never propagated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ItemError {
    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Tracking commit failed: {0}")]
    TrackingCommitFailed(String),

    #[error("Library update failed: {0}")]
    LibraryUpdateFailed(String),

    #[error("Worker failed: {0}")]
    WorkerPanicked(String),
}

/// Attempted a move the state machine does not allow.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Cannot {operation} item {item}: current state is {current}")]
pub struct TransitionError {
    pub item: ItemId,
    pub current: MatchStatus,
    pub operation: &'static str,
}

/// One untracked library entry under reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: ItemId,
    pub title: String,
    pub entry: EntryKey,
    pub selected: bool,
    pub status: MatchStatus,
    /// Present iff `status.is_match()`.
    pub candidate: Option<MatchedCandidate>,
    /// Accepted below the exact threshold.
    pub is_fuzzy: bool,
    pub label: String,
    pub error: Option<String>,
}

impl WorkItem {
    pub fn new(id: ItemId, entry: &LibraryEntry) -> Self {
        Self {
            id,
            title: entry.title.clone(),
            entry: entry.key(),
            selected: false,
            status: MatchStatus::Pending,
            candidate: None,
            is_fuzzy: false,
            label: MatchStatus::Pending.label().to_string(),
            error: None,
        }
    }

    fn illegal(&self, operation: &'static str) -> TransitionError {
        TransitionError {
            item: self.id,
            current: self.status,
            operation,
        }
    }

    fn set_status(&mut self, status: MatchStatus) {
        self.status = status;
        self.label = status.label().to_string();
    }

    /// Back to Pending at the start of a matching pass.
    pub fn reset(&mut self) {
        self.set_status(MatchStatus::Pending);
        self.selected = false;
        self.candidate = None;
        self.is_fuzzy = false;
        self.error = None;
    }

    /// Pending -> InProgress, right before dispatch.
    pub fn begin(&mut self) -> Result<(), TransitionError> {
        if self.status != MatchStatus::Pending {
            return Err(self.illegal("begin matching"));
        }
        self.set_status(MatchStatus::InProgress);
        Ok(())
    }

    /// InProgress -> Matched, FuzzyMatched or NoMatch.
    pub fn complete(&mut self, result: &MatchResult) -> Result<(), TransitionError> {
        if self.status != MatchStatus::InProgress {
            return Err(self.illegal("complete"));
        }

        match (result.verdict, result.accepted()) {
            (MatchVerdict::Exact, Some(best)) => {
                self.accept(best.into(), MatchStatus::Matched, false);
            }
            (MatchVerdict::Fuzzy, Some(best)) => {
                self.accept(best.into(), MatchStatus::FuzzyMatched, true);
            }
            _ => {
                self.set_status(MatchStatus::NoMatch);
                self.candidate = None;
                self.is_fuzzy = false;
            }
        }
        Ok(())
    }

    fn accept(&mut self, candidate: MatchedCandidate, status: MatchStatus, is_fuzzy: bool) {
        self.set_status(status);
        self.candidate = Some(candidate);
        self.is_fuzzy = is_fuzzy;
        self.selected = true;
    }

    /// InProgress -> Error.
    pub fn fail(&mut self, error: &ItemError) -> Result<(), TransitionError> {
        if self.status != MatchStatus::InProgress {
            return Err(self.illegal("fail"));
        }
        self.set_status(MatchStatus::Error);
        self.candidate = None;
        self.is_fuzzy = false;
        self.error = Some(error.to_string());
        Ok(())
    }

    /// User-picked candidate. Allowed from any state except InProgress.
    pub fn select_manual(&mut self, candidate: MatchedCandidate) -> Result<(), TransitionError> {
        if self.status == MatchStatus::InProgress {
            return Err(self.illegal("select a candidate for"));
        }
        self.accept(candidate, MatchStatus::Matched, false);
        self.error = None;
        Ok(())
    }

    /// Tracking link committed.
    pub fn mark_tracked(&mut self) -> Result<(), TransitionError> {
        if !self.status.is_match() {
            return Err(self.illegal("mark tracked"));
        }
        self.status = MatchStatus::Matched;
        self.label = TRACKED_LABEL.to_string();
        Ok(())
    }

    /// Tracking link could not be committed. The candidate is cleared, so the
    /// item has to be re-matched before it can be committed again.
    pub fn mark_track_failed(&mut self, error: &ItemError) -> Result<(), TransitionError> {
        if !self.status.is_match() {
            return Err(self.illegal("mark tracking failed for"));
        }
        self.status = MatchStatus::Error;
        self.label = TRACK_ERROR_LABEL.to_string();
        self.candidate = None;
        self.is_fuzzy = false;
        self.selected = false;
        self.error = Some(error.to_string());
        Ok(())
    }

    /// Selected and carrying a candidate.
    pub fn is_committable(&self) -> bool {
        self.selected && self.status.is_match() && self.candidate.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogCandidate;
    use crate::matching::best_match;
    use crate::testing::fixtures;

    fn item(title: &str) -> WorkItem {
        WorkItem::new(ItemId(0), &fixtures::entry(title))
    }

    fn result(title: &str, candidate: &str) -> MatchResult {
        best_match(title, &[CatalogCandidate::new(42, candidate)])
    }

    #[test]
    fn test_new_item_is_pending_and_unselected() {
        let item = item("Berserk");
        assert_eq!(item.status, MatchStatus::Pending);
        assert_eq!(item.label, "Pending");
        assert!(!item.selected);
        assert!(item.candidate.is_none());
    }

    #[test]
    fn test_exact_match() {
        let mut item = item("Berserk");
        item.begin().unwrap();
        assert_eq!(item.label, "Searching...");
        item.complete(&result("Berserk", "Berserk")).unwrap();

        assert_eq!(item.status, MatchStatus::Matched);
        assert!(item.selected);
        assert!(!item.is_fuzzy);
        assert_eq!(item.candidate.as_ref().unwrap().id, 42);
    }

    #[test]
    fn test_fuzzy_match_is_selected() {
        let mut item = item("Chainsaw Man Season 1");
        item.begin().unwrap();
        item.complete(&result("Chainsaw Man Season 1", "Chainsawman")).unwrap();

        assert_eq!(item.status, MatchStatus::FuzzyMatched);
        assert_eq!(item.label, "Fuzzy Match");
        assert!(item.selected);
        assert!(item.is_fuzzy);
    }

    #[test]
    fn test_no_match_has_no_candidate() {
        let mut item = item("Yotsuba to!");
        item.begin().unwrap();
        item.complete(&result("Yotsuba to!", "Vagabond")).unwrap();

        assert_eq!(item.status, MatchStatus::NoMatch);
        assert!(item.candidate.is_none());
        assert!(!item.selected);
    }

    #[test]
    fn test_status_is_monotone_within_pass() {
        let mut item = item("Berserk");
        assert!(item.complete(&MatchResult::no_candidates()).is_err());

        item.begin().unwrap();
        let err = item.begin().unwrap_err();
        assert_eq!(err.current, MatchStatus::InProgress);

        item.fail(&ItemError::SearchFailed("timeout".into())).unwrap();
        assert!(item.begin().is_err());
        assert!(item.complete(&MatchResult::no_candidates()).is_err());
        assert_eq!(item.error.as_deref(), Some("Search failed: timeout"));
    }

    #[test]
    fn test_reset_clears_pass_state() {
        let mut item = item("Berserk");
        item.begin().unwrap();
        item.complete(&result("Berserk", "Berserk")).unwrap();
        item.reset();

        assert_eq!(item.status, MatchStatus::Pending);
        assert!(item.candidate.is_none());
        assert!(!item.selected);
        assert!(item.begin().is_ok());
    }

    #[test]
    fn test_manual_selection() {
        let mut item = item("Berserk");
        item.begin().unwrap();
        let candidate = MatchedCandidate {
            id: 2,
            title: "Berserk".into(),
            score: 100,
        };
        assert!(item.select_manual(candidate.clone()).is_err());

        item.complete(&MatchResult::no_candidates()).unwrap();
        item.select_manual(candidate).unwrap();
        assert_eq!(item.status, MatchStatus::Matched);
        assert!(item.selected);
        assert!(!item.is_fuzzy);
        assert!(item.is_committable());
    }

    #[test]
    fn test_tracking_outcomes() {
        let mut tracked = item("Berserk");
        tracked.begin().unwrap();
        tracked.complete(&result("Berserk", "Berserk")).unwrap();
        tracked.mark_tracked().unwrap();
        assert_eq!(tracked.status, MatchStatus::Matched);
        assert_eq!(tracked.label, "Tracked");

        let mut failed = item("Berserk");
        failed.begin().unwrap();
        failed.complete(&result("Berserk", "Berserk")).unwrap();
        failed
            .mark_track_failed(&ItemError::TrackingCommitFailed("503".into()))
            .unwrap();
        assert_eq!(failed.status, MatchStatus::Error);
        assert_eq!(failed.label, "Track Error");
        assert!(failed.candidate.is_none());
        assert!(!failed.is_committable());
        assert!(failed.mark_tracked().is_err());
    }

    #[test]
    fn test_display_mapping() {
        assert_eq!(MatchStatus::NoMatch.colour(), MatchStatus::Error.colour());
        assert_ne!(MatchStatus::Matched.colour(), MatchStatus::FuzzyMatched.colour());
        assert_eq!(MatchStatus::FuzzyMatched.to_string(), "fuzzy_matched");
        assert!(MatchStatus::NoMatch.is_terminal());
        assert!(!MatchStatus::InProgress.is_terminal());
    }
}
