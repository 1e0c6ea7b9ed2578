//! Title matching: normalization, similarity scoring and classification.
//!
//! Everything here is pure except [`MatchWorker`], which performs one
//! catalog search per call.

mod classify;
mod normalize;
mod similarity;
mod types;
mod worker;

pub use classify::{classify, MatchVerdict, EXACT_MATCH_SCORE, FUZZY_MATCH_THRESHOLD};
pub use normalize::normalize;
pub use similarity::{score, score_normalized};
pub use types::{MatchError, MatchResult, ScoredCandidate};
pub use worker::{best_match, score_candidate, MatchWorker, DEFAULT_SEARCH_LIMIT};
