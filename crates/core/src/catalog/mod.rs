//! Remote catalog integration.
//!
//! The reconciliation engine talks to the catalog only through the
//! [`CatalogService`] trait. [`MalClient`] is the MyAnimeList implementation.

mod mal;
mod types;

pub use mal::{MalClient, MalConfig, MAX_SEARCH_LIMIT};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when interacting with the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Credentials were rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing token, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl CatalogError {
    /// Whether repeating the request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::HttpError(e) => e.is_timeout() || e.is_connect(),
            CatalogError::RateLimitExceeded => true,
            CatalogError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Remote catalog and tracker.
///
/// Implementations must tolerate as many concurrent calls as the configured
/// worker count; the engine does not serialize access further.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Search the catalog by title, best results first.
    async fn search(&self, title: &str, limit: u32)
        -> Result<Vec<CatalogCandidate>, CatalogError>;

    /// Fetch the full record of a catalog entry.
    async fn get_details(&self, id: CatalogId) -> Result<CatalogDetails, CatalogError>;

    /// Add an entry to the user's list as "plan to read".
    async fn add_tracking(&self, id: CatalogId) -> Result<(), CatalogError>;

    /// Update status, progress or score of a tracked entry.
    async fn update_tracking_status(
        &self,
        id: CatalogId,
        update: &TrackingUpdate,
    ) -> Result<(), CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CatalogError::ApiError {
            status: 503,
            message: "down".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 503 - down");
        assert_eq!(
            CatalogError::RateLimitExceeded.to_string(),
            "Rate limit exceeded, please wait before retrying"
        );
    }

    #[test]
    fn test_transient_kinds() {
        assert!(CatalogError::RateLimitExceeded.is_transient());
        assert!(CatalogError::ApiError {
            status: 502,
            message: String::new()
        }
        .is_transient());
        assert!(!CatalogError::ApiError {
            status: 400,
            message: String::new()
        }
        .is_transient());
        assert!(!CatalogError::Unauthorized("expired".to_string()).is_transient());
    }
}
