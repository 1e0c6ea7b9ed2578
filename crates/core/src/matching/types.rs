//! Matching result types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::classify::MatchVerdict;
use crate::catalog::{CatalogCandidate, CatalogError};

/// A catalog candidate with its best similarity to the searched title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: CatalogCandidate,
    /// Best score over the primary and alternative titles (0-100).
    pub score: u8,
    /// The candidate title that produced the score.
    pub matched_title: String,
}

/// Outcome of matching one title against the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    /// Highest scoring candidate, `None` when the search returned nothing.
    pub best: Option<ScoredCandidate>,
    pub verdict: MatchVerdict,
}

impl MatchResult {
    /// Result for an empty search.
    pub fn no_candidates() -> Self {
        Self {
            best: None,
            verdict: MatchVerdict::None,
        }
    }

    /// Best score, 0 without candidates.
    pub fn score(&self) -> u8 {
        self.best.as_ref().map_or(0, |b| b.score)
    }

    /// The accepted candidate, if the verdict is a match.
    pub fn accepted(&self) -> Option<&ScoredCandidate> {
        if self.verdict.is_match() {
            self.best.as_ref()
        } else {
            None
        }
    }
}

/// Errors from a single match attempt.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Search failed: {0}")]
    SearchFailed(#[from] CatalogError),
}
