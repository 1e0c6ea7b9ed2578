//! Prometheus metrics for the reconciliation engine.
//!
//! This module provides metrics for:
//! - Matching (verdicts, best scores, search failures)
//! - Tracking commits
//! - Catalog requests

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Registry holding every engine metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        let _ = registry.register(metric);
    }
    registry
});

// =============================================================================
// Matching
// =============================================================================

/// Match outcomes by verdict.
pub static MATCH_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shelfsync_match_results_total", "Total matching outcomes"),
        &["verdict"], // "exact", "fuzzy", "none"
    )
    .unwrap()
});

/// Best similarity score per searched title.
pub static MATCH_SCORE: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "shelfsync_match_score",
            "Distribution of best candidate similarity scores",
        )
        .buckets(vec![10.0, 25.0, 50.0, 70.0, 80.0, 85.0, 90.0, 95.0, 99.0, 100.0]),
        &[],
    )
    .unwrap()
});

/// Failed catalog searches.
pub static SEARCH_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "shelfsync_search_failures_total",
        "Total catalog searches that failed",
    )
    .unwrap()
});

// =============================================================================
// Tracking
// =============================================================================

/// Tracking commits by result.
pub static TRACKING_COMMITS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("shelfsync_tracking_commits_total", "Total tracking commits"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Catalog
// =============================================================================

/// Catalog request duration in seconds.
pub static CATALOG_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "shelfsync_catalog_request_duration_seconds",
            "Duration of catalog API requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .unwrap()
});

/// Get all engine metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(MATCH_RESULTS.clone()),
        Box::new(MATCH_SCORE.clone()),
        Box::new(SEARCH_FAILURES.clone()),
        Box::new(TRACKING_COMMITS.clone()),
        Box::new(CATALOG_REQUEST_DURATION.clone()),
    ]
}

/// Encode the registry in the Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
