//! Search-and-score for a single title.

use std::sync::Arc;

use tracing::debug;

use super::classify::classify;
use super::similarity::score;
use super::types::{MatchError, MatchResult, ScoredCandidate};
use crate::catalog::{CatalogCandidate, CatalogService};
use crate::metrics;

/// Default number of candidates requested per title.
pub const DEFAULT_SEARCH_LIMIT: u32 = 5;

/// Score a candidate against a title, keeping its best-matching title.
pub fn score_candidate(title: &str, candidate: &CatalogCandidate) -> ScoredCandidate {
    let mut best_score = 0;
    let mut best_title = candidate.title.as_str();

    for (idx, other) in candidate.titles().enumerate() {
        let s = score(title, other);
        if idx == 0 || s > best_score {
            best_score = s;
            best_title = other;
        }
    }

    ScoredCandidate {
        candidate: candidate.clone(),
        score: best_score,
        matched_title: best_title.to_string(),
    }
}

/// Pick the best of `candidates` for `title` and classify it.
///
/// The first candidate wins ties, so catalog relevance order breaks them.
pub fn best_match(title: &str, candidates: &[CatalogCandidate]) -> MatchResult {
    let mut best: Option<ScoredCandidate> = None;

    for candidate in candidates {
        let scored = score_candidate(title, candidate);
        if best.as_ref().map_or(true, |b| scored.score > b.score) {
            best = Some(scored);
        }
    }

    match best {
        Some(best) => MatchResult {
            verdict: classify(best.score),
            best: Some(best),
        },
        None => MatchResult::no_candidates(),
    }
}

/// Runs one catalog search for a title and scores the results.
///
/// Has no side effects on work items; callers apply the result.
#[derive(Clone)]
pub struct MatchWorker {
    catalog: Arc<dyn CatalogService>,
    search_limit: u32,
}

impl MatchWorker {
    pub fn new(catalog: Arc<dyn CatalogService>, search_limit: u32) -> Self {
        Self {
            catalog,
            search_limit,
        }
    }

    /// Search the catalog for `title` and return the classified best match.
    pub async fn match_title(&self, title: &str) -> Result<MatchResult, MatchError> {
        let candidates = match self.catalog.search(title, self.search_limit).await {
            Ok(candidates) => candidates,
            Err(e) => {
                metrics::SEARCH_FAILURES.inc();
                return Err(MatchError::SearchFailed(e));
            }
        };

        let result = best_match(title, &candidates);
        debug!(
            "Matched '{}': {} candidates, best score {}, verdict {:?}",
            title,
            candidates.len(),
            result.score(),
            result.verdict
        );

        metrics::MATCH_RESULTS
            .with_label_values(&[result.verdict.as_str()])
            .inc();
        if result.best.is_some() {
            metrics::MATCH_SCORE
                .with_label_values(&[])
                .observe(f64::from(result.score()));
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchVerdict;
    use crate::testing::{MockCatalog, RecordedCatalogCall};

    #[test]
    fn test_alternative_title_can_win() {
        let candidate = CatalogCandidate::new(11, "Shingeki no Kyojin")
            .with_alternatives(["Attack on Titan", "進撃の巨人"]);
        let scored = score_candidate("Attack on Titan", &candidate);
        assert_eq!(scored.score, 100);
        assert_eq!(scored.matched_title, "Attack on Titan");
    }

    #[test]
    fn test_best_match_across_candidates() {
        let candidates = vec![
            CatalogCandidate::new(1, "One Punch-Man"),
            CatalogCandidate::new(2, "One Piece"),
            CatalogCandidate::new(3, "One Piece Party"),
        ];
        let result = best_match("One Piece", &candidates);
        assert_eq!(result.verdict, MatchVerdict::Exact);
        assert_eq!(result.best.unwrap().candidate.id, 2);
    }

    #[test]
    fn test_first_candidate_wins_ties() {
        let candidates = vec![
            CatalogCandidate::new(7, "Berserk"),
            CatalogCandidate::new(8, "Berserk"),
        ];
        let result = best_match("Berserk", &candidates);
        assert_eq!(result.best.unwrap().candidate.id, 7);
    }

    #[test]
    fn test_low_score_keeps_best_but_no_verdict() {
        let candidates = vec![CatalogCandidate::new(4, "Vagabond")];
        let result = best_match("Yotsuba to!", &candidates);
        assert_eq!(result.verdict, MatchVerdict::None);
        assert!(result.best.is_some());
        assert!(result.accepted().is_none());
    }

    #[tokio::test]
    async fn test_match_title_fuzzy() {
        let catalog = Arc::new(MockCatalog::new());
        catalog
            .set_results(
                "Chainsaw Man Season 1",
                vec![CatalogCandidate::new(116778, "Chainsawman")],
            )
            .await;

        let worker = MatchWorker::new(catalog.clone(), DEFAULT_SEARCH_LIMIT);
        let result = worker.match_title("Chainsaw Man Season 1").await.unwrap();

        assert_eq!(result.verdict, MatchVerdict::Fuzzy);
        assert_eq!(result.accepted().unwrap().candidate.id, 116778);

        let calls = catalog.recorded_calls().await;
        assert!(matches!(
            &calls[..],
            [RecordedCatalogCall::Search { query, limit: 5 }] if query == "Chainsaw Man Season 1"
        ));
    }

    #[tokio::test]
    async fn test_no_candidates_is_not_an_error() {
        let catalog = Arc::new(MockCatalog::new());
        let worker = MatchWorker::new(catalog, DEFAULT_SEARCH_LIMIT);

        let result = worker.match_title("Unknown Doujin").await.unwrap();
        assert_eq!(result, MatchResult::no_candidates());
    }

    #[tokio::test]
    async fn test_search_failure_maps_to_search_failed() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.fail_search("Berserk").await;
        let worker = MatchWorker::new(catalog, DEFAULT_SEARCH_LIMIT);

        let result = worker.match_title("Berserk").await;
        assert!(matches!(result, Err(MatchError::SearchFailed(_))));
    }

    #[tokio::test]
    async fn test_search_limit_is_respected() {
        let catalog = Arc::new(MockCatalog::new());
        let many: Vec<CatalogCandidate> = (0..10)
            .map(|i| CatalogCandidate::new(i, format!("Dragon Ball {}", i)))
            .collect();
        catalog.set_results("Dragon Ball", many).await;

        let worker = MatchWorker::new(catalog.clone(), 3);
        worker.match_title("Dragon Ball").await.unwrap();
        assert_eq!(catalog.last_search_result_count().await, Some(3));
    }
}
