//! Mock catalog service for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::catalog::{
    CatalogCandidate, CatalogDetails, CatalogError, CatalogId, CatalogService, TrackingUpdate,
};

/// A recorded catalog call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCatalogCall {
    Search { query: String, limit: u32 },
    GetDetails { id: CatalogId },
    AddTracking { id: CatalogId },
    UpdateTracking { id: CatalogId, update: TrackingUpdate },
}

/// Mock implementation of the CatalogService trait.
///
/// Provides controllable behavior for testing:
/// - Return configured candidates per query
/// - Track calls and peak concurrency for assertions
/// - Simulate failures and latency
///
/// # Example
///
/// ```rust,ignore
/// use shelfsync_core::testing::{MockCatalog, fixtures};
///
/// let catalog = MockCatalog::new();
/// catalog.set_results("Berserk", vec![fixtures::candidate(22, "Berserk")]).await;
///
/// let results = catalog.search("Berserk", 5).await?;
/// assert_eq!(results.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockCatalog {
    /// Search results by exact query.
    results: Arc<RwLock<HashMap<String, Vec<CatalogCandidate>>>>,
    /// Details by catalog ID.
    details: Arc<RwLock<HashMap<CatalogId, CatalogDetails>>>,
    /// Queries whose search always fails.
    failing_queries: Arc<RwLock<HashSet<String>>>,
    /// IDs whose tracking calls always fail.
    failing_tracking: Arc<RwLock<HashSet<CatalogId>>>,
    /// IDs successfully added to the list, in call order.
    tracked: Arc<RwLock<Vec<CatalogId>>>,
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedCatalogCall>>>,
    /// Number of candidates the last search returned.
    last_search_count: Arc<RwLock<Option<usize>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<CatalogError>>>,
    /// Delay applied to every call.
    latency: Arc<RwLock<Duration>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalog {
    /// Create a new empty mock catalog.
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(HashMap::new())),
            details: Arc::new(RwLock::new(HashMap::new())),
            failing_queries: Arc::new(RwLock::new(HashSet::new())),
            failing_tracking: Arc::new(RwLock::new(HashSet::new())),
            tracked: Arc::new(RwLock::new(Vec::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            last_search_count: Arc::new(RwLock::new(None)),
            next_error: Arc::new(RwLock::new(None)),
            latency: Arc::new(RwLock::new(Duration::ZERO)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Set the candidates returned for `query`.
    pub async fn set_results(&self, query: &str, candidates: Vec<CatalogCandidate>) {
        self.results
            .write()
            .await
            .insert(query.to_string(), candidates);
    }

    /// Add a details record.
    pub async fn add_details(&self, details: CatalogDetails) {
        self.details.write().await.insert(details.id, details);
    }

    /// Make every search for `query` fail with a 503.
    pub async fn fail_search(&self, query: &str) {
        self.failing_queries.write().await.insert(query.to_string());
    }

    /// Make every tracking call for `id` fail with a 503.
    pub async fn fail_tracking(&self, id: CatalogId) {
        self.failing_tracking.write().await.insert(id);
    }

    /// Delay every call by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCatalogCall> {
        self.calls.read().await.clone()
    }

    /// Number of searches performed.
    pub async fn search_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, RecordedCatalogCall::Search { .. }))
            .count()
    }

    /// IDs successfully added to the list.
    pub async fn tracked_ids(&self) -> Vec<CatalogId> {
        self.tracked.read().await.clone()
    }

    pub async fn last_search_result_count(&self) -> Option<usize> {
        *self.last_search_count.read().await
    }

    /// Highest number of calls that were executing at once.
    pub fn max_concurrent_calls(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Error Injection
    // =========================================================================

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Option<CatalogError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, call: RecordedCatalogCall) {
        self.calls.write().await.push(call);
    }

    /// Mark a call in flight for its lifetime and apply the configured latency.
    async fn enter(&self) -> InFlight {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(Arc::clone(&self.in_flight));

        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        guard
    }

    async fn check_tracking(&self, id: CatalogId) -> Result<(), CatalogError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        if self.failing_tracking.read().await.contains(&id) {
            return Err(unavailable());
        }
        Ok(())
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn unavailable() -> CatalogError {
    CatalogError::ApiError {
        status: 503,
        message: "Service Unavailable".to_string(),
    }
}

#[async_trait]
impl CatalogService for MockCatalog {
    async fn search(
        &self,
        title: &str,
        limit: u32,
    ) -> Result<Vec<CatalogCandidate>, CatalogError> {
        let _guard = self.enter().await;

        self.record(RecordedCatalogCall::Search {
            query: title.to_string(),
            limit,
        })
        .await;

        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        if self.failing_queries.read().await.contains(title) {
            return Err(unavailable());
        }

        let results: Vec<CatalogCandidate> = self
            .results
            .read()
            .await
            .get(title)
            .map(|c| c.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default();

        *self.last_search_count.write().await = Some(results.len());
        Ok(results)
    }

    async fn get_details(&self, id: CatalogId) -> Result<CatalogDetails, CatalogError> {
        let _guard = self.enter().await;
        self.record(RecordedCatalogCall::GetDetails { id }).await;

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        self.details
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("Manga {} not found", id)))
    }

    async fn add_tracking(&self, id: CatalogId) -> Result<(), CatalogError> {
        let _guard = self.enter().await;
        self.record(RecordedCatalogCall::AddTracking { id }).await;

        self.check_tracking(id).await?;
        self.tracked.write().await.push(id);
        Ok(())
    }

    async fn update_tracking_status(
        &self,
        id: CatalogId,
        update: &TrackingUpdate,
    ) -> Result<(), CatalogError> {
        let _guard = self.enter().await;
        self.record(RecordedCatalogCall::UpdateTracking {
            id,
            update: update.clone(),
        })
        .await;

        self.check_tracking(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ListStatus;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_search_returns_configured_results() {
        let catalog = MockCatalog::new();
        catalog
            .set_results("Berserk", vec![fixtures::candidate(2, "Berserk")])
            .await;

        let results = catalog.search("Berserk", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(catalog.search("berserk", 5).await.unwrap().is_empty());
        assert_eq!(catalog.search_count().await, 2);
    }

    #[tokio::test]
    async fn test_error_injection() {
        let catalog = MockCatalog::new();
        catalog.set_next_error(CatalogError::RateLimitExceeded).await;

        let result = catalog.search("test", 5).await;
        assert!(matches!(result, Err(CatalogError::RateLimitExceeded)));

        // Error should be consumed
        assert!(catalog.search("test", 5).await.is_ok());
    }

    #[tokio::test]
    async fn test_tracking_failures_and_recording() {
        let catalog = MockCatalog::new();
        catalog.fail_tracking(9).await;

        assert!(catalog.add_tracking(3).await.is_ok());
        assert!(catalog.add_tracking(9).await.is_err());
        let update = TrackingUpdate {
            status: Some(ListStatus::Reading),
            ..Default::default()
        };
        assert!(catalog.update_tracking_status(3, &update).await.is_ok());

        assert_eq!(catalog.tracked_ids().await, vec![3]);
        let calls = catalog.recorded_calls().await;
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[2],
            RecordedCatalogCall::UpdateTracking { id: 3, update }
        );
    }

    #[tokio::test]
    async fn test_details_not_found() {
        let catalog = MockCatalog::new();
        catalog.add_details(fixtures::details(5, "Monster", 162)).await;

        assert_eq!(catalog.get_details(5).await.unwrap().num_chapters, 162);
        assert!(matches!(
            catalog.get_details(6).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_peak_concurrency_is_tracked() {
        let catalog = Arc::new(MockCatalog::new());
        catalog.set_latency(Duration::from_millis(20)).await;

        let a = tokio::spawn({
            let c = Arc::clone(&catalog);
            async move { c.search("a", 5).await }
        });
        let b = tokio::spawn({
            let c = Arc::clone(&catalog);
            async move { c.search("b", 5).await }
        });
        let _ = a.await;
        let _ = b.await;

        assert_eq!(catalog.max_concurrent_calls(), 2);
    }
}
