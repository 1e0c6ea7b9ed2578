//! MyAnimeList API v2 client.
//!
//! Authenticated calls use a bearer token obtained elsewhere (the OAuth flow
//! is not handled here). Read-only calls also work with a bare client ID.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{CatalogCandidate, CatalogDetails, CatalogId, TrackingUpdate};
use super::{CatalogError, CatalogService};
use crate::metrics;

/// The API refuses larger search pages for manga.
pub const MAX_SEARCH_LIMIT: u32 = 15;

const DEFAULT_BASE_URL: &str = "https://api.myanimelist.net/v2";

const DETAIL_FIELDS: &str =
    "id,title,synopsis,num_chapters,status,mean,media_type,start_date,end_date,main_picture";

/// MyAnimeList client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalConfig {
    /// OAuth access token. Required for list updates.
    #[serde(default)]
    pub access_token: String,
    /// Client ID, enough for searches and details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Base URL (default: https://api.myanimelist.net/v2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for MalConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            client_id: None,
            base_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// MyAnimeList API client.
pub struct MalClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    client_id: Option<String>,
}

impl MalClient {
    /// Create a new client.
    pub fn new(config: MalConfig) -> Result<Self, CatalogError> {
        let access_token = Some(config.access_token).filter(|t| !t.trim().is_empty());
        let client_id = config.client_id.filter(|id| !id.trim().is_empty());

        if access_token.is_none() && client_id.is_none() {
            return Err(CatalogError::NotConfigured(
                "MyAnimeList access token or client ID is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            access_token,
            client_id,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match (&self.access_token, &self.client_id) {
            (Some(token), _) => request.bearer_auth(token),
            (None, Some(id)) => request.header("X-MAL-CLIENT-ID", id),
            (None, None) => request,
        }
    }

    fn require_token(&self) -> Result<(), CatalogError> {
        if self.access_token.is_none() {
            return Err(CatalogError::NotConfigured(
                "an access token is required to modify the user's list".to_string(),
            ));
        }
        Ok(())
    }

    /// Send a request, timing it and mapping HTTP failures.
    async fn send(
        &self,
        operation: &str,
        request: RequestBuilder,
        what: &str,
    ) -> Result<Response, CatalogError> {
        let started = Instant::now();
        let result = self.authorize(request).send().await;
        metrics::CATALOG_REQUEST_DURATION
            .with_label_values(&[operation])
            .observe(started.elapsed().as_secs_f64());

        let response = result?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => CatalogError::Unauthorized(body),
            404 => CatalogError::NotFound(what.to_string()),
            429 => CatalogError::RateLimitExceeded,
            code => CatalogError::ApiError {
                status: code,
                message: body,
            },
        })
    }
}

#[async_trait]
impl CatalogService for MalClient {
    async fn search(
        &self,
        title: &str,
        limit: u32,
    ) -> Result<Vec<CatalogCandidate>, CatalogError> {
        let url = format!("{}/manga", self.base_url);
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

        debug!("MAL manga search: query='{}', limit={}", title, limit);

        let request = self.client.get(&url).query(&[
            ("q", title.to_string()),
            ("limit", limit.to_string()),
            ("fields", "alternative_titles".to_string()),
        ]);
        let response = self.send("search", request, title).await?;

        let page: MalPage = response.json().await.map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse search response: {}", e))
        })?;

        Ok(page.data.into_iter().map(|entry| entry.node.into()).collect())
    }

    async fn get_details(&self, id: CatalogId) -> Result<CatalogDetails, CatalogError> {
        let url = format!("{}/manga/{}", self.base_url, id);

        debug!("MAL get manga: id={}", id);

        let request = self.client.get(&url).query(&[("fields", DETAIL_FIELDS)]);
        let response = self.send("details", request, &format!("Manga ID {}", id)).await?;

        let details: MalDetails = response.json().await.map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse manga response: {}", e))
        })?;

        Ok(details.into())
    }

    async fn add_tracking(&self, id: CatalogId) -> Result<(), CatalogError> {
        self.require_token()?;
        let url = format!("{}/manga/{}/my_list_status", self.base_url, id);

        debug!("MAL add to list: id={}", id);

        let request = self.client.patch(&url).form(&[("status", "plan_to_read")]);
        self.send("add_tracking", request, &format!("Manga ID {}", id))
            .await?;
        Ok(())
    }

    async fn update_tracking_status(
        &self,
        id: CatalogId,
        update: &TrackingUpdate,
    ) -> Result<(), CatalogError> {
        self.require_token()?;
        let url = format!("{}/manga/{}/my_list_status", self.base_url, id);

        let form = update_form(update);
        debug!("MAL update list status: id={}, fields={:?}", id, form);

        let request = self.client.patch(&url).form(&form);
        self.send("update_tracking", request, &format!("Manga ID {}", id))
            .await?;
        Ok(())
    }
}

fn update_form(update: &TrackingUpdate) -> Vec<(&'static str, String)> {
    let mut form = Vec::new();
    if let Some(status) = update.status {
        form.push(("status", status.api_name().to_string()));
    }
    if let Some(chapters) = update.chapters_read {
        form.push(("num_chapters_read", chapters.to_string()));
    }
    if let Some(score) = update.score {
        form.push(("score", score.min(10).to_string()));
    }
    form
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct MalPage {
    #[serde(default)]
    data: Vec<MalPageEntry>,
}

#[derive(Debug, Deserialize)]
struct MalPageEntry {
    node: MalNode,
}

#[derive(Debug, Deserialize)]
struct MalNode {
    id: CatalogId,
    title: String,
    #[serde(default)]
    alternative_titles: Option<MalAlternativeTitles>,
}

#[derive(Debug, Default, Deserialize)]
struct MalAlternativeTitles {
    #[serde(default)]
    synonyms: Vec<String>,
    #[serde(default)]
    en: Option<String>,
    #[serde(default)]
    ja: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MalDetails {
    id: CatalogId,
    title: String,
    #[serde(default)]
    synopsis: Option<String>,
    #[serde(default)]
    num_chapters: u32,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    mean: Option<f32>,
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    main_picture: Option<MalPicture>,
}

#[derive(Debug, Deserialize)]
struct MalPicture {
    #[serde(default)]
    medium: Option<String>,
    #[serde(default)]
    large: Option<String>,
}

impl From<MalNode> for CatalogCandidate {
    fn from(node: MalNode) -> Self {
        let alt = node.alternative_titles.unwrap_or_default();
        let mut alternative_titles = alt.synonyms;
        alternative_titles.extend(alt.en.into_iter().chain(alt.ja));
        alternative_titles.retain(|t| !t.trim().is_empty());

        CatalogCandidate {
            id: node.id,
            title: node.title,
            alternative_titles,
        }
    }
}

impl From<MalDetails> for CatalogDetails {
    fn from(d: MalDetails) -> Self {
        CatalogDetails {
            id: d.id,
            title: d.title,
            synopsis: d.synopsis,
            num_chapters: d.num_chapters,
            status: d.status,
            mean: d.mean,
            media_type: d.media_type,
            start_date: d.start_date,
            end_date: d.end_date,
            picture_url: d.main_picture.and_then(|p| p.large.or(p.medium)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ListStatus;

    #[test]
    fn test_requires_credentials() {
        let result = MalClient::new(MalConfig::default());
        assert!(matches!(result, Err(CatalogError::NotConfigured(_))));
    }

    #[test]
    fn test_client_id_only_is_enough() {
        let config = MalConfig {
            client_id: Some("abc".to_string()),
            base_url: Some("http://localhost:9/v2/".to_string()),
            ..Default::default()
        };
        let client = MalClient::new(config).unwrap();
        assert_eq!(client.base_url, "http://localhost:9/v2");
        assert!(client.require_token().is_err());
    }

    #[test]
    fn test_search_page_conversion() {
        let json = r#"{
            "data": [
                {"node": {"id": 116778, "title": "Chainsaw Man",
                          "alternative_titles": {"synonyms": ["Chainsawman"], "en": "Chainsaw Man", "ja": "チェンソーマン"}}},
                {"node": {"id": 2, "title": "Berserk"}}
            ],
            "paging": {}
        }"#;
        let page: MalPage = serde_json::from_str(json).unwrap();
        let candidates: Vec<CatalogCandidate> =
            page.data.into_iter().map(|e| e.node.into()).collect();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, 116778);
        assert_eq!(
            candidates[0].alternative_titles,
            vec!["Chainsawman", "Chainsaw Man", "チェンソーマン"]
        );
        assert!(candidates[1].alternative_titles.is_empty());
    }

    #[test]
    fn test_empty_alternatives_dropped() {
        let json = r#"{"id": 5, "title": "X", "alternative_titles": {"synonyms": [], "en": "", "ja": ""}}"#;
        let node: MalNode = serde_json::from_str(json).unwrap();
        let candidate: CatalogCandidate = node.into();
        assert!(candidate.alternative_titles.is_empty());
    }

    #[test]
    fn test_details_conversion() {
        let json = r#"{
            "id": 2, "title": "Berserk", "num_chapters": 0, "status": "currently_publishing",
            "mean": 9.47, "main_picture": {"medium": "m.jpg", "large": "l.jpg"}
        }"#;
        let details: CatalogDetails = serde_json::from_str::<MalDetails>(json).unwrap().into();
        assert_eq!(details.title, "Berserk");
        assert_eq!(details.picture_url.as_deref(), Some("l.jpg"));
        assert!(details.synopsis.is_none());
    }

    #[test]
    fn test_update_form_fields() {
        let update = TrackingUpdate {
            status: Some(ListStatus::Reading),
            chapters_read: Some(12),
            score: Some(11),
        };
        let form = update_form(&update);
        assert_eq!(
            form,
            vec![
                ("status", "reading".to_string()),
                ("num_chapters_read", "12".to_string()),
                ("score", "10".to_string()),
            ]
        );
        assert!(update_form(&TrackingUpdate::default()).is_empty());
    }
}
