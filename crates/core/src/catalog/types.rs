//! Types shared by catalog clients.

use serde::{Deserialize, Serialize};

/// Remote catalog identifier.
pub type CatalogId = u64;

/// A search result from the remote catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogCandidate {
    /// Catalog ID.
    pub id: CatalogId,
    /// Primary title.
    pub title: String,
    /// Synonyms and localized variants (English, Japanese).
    #[serde(default)]
    pub alternative_titles: Vec<String>,
}

impl CatalogCandidate {
    /// Create a candidate with no alternative titles.
    pub fn new(id: CatalogId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            alternative_titles: Vec::new(),
        }
    }

    /// Add alternative titles.
    pub fn with_alternatives<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternative_titles
            .extend(titles.into_iter().map(Into::into));
        self
    }

    /// Primary title followed by every non-empty alternative.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title.as_str()).chain(
            self.alternative_titles
                .iter()
                .map(String::as_str)
                .filter(|t| !t.trim().is_empty()),
        )
    }
}

/// Detailed catalog record, used for presentation only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogDetails {
    pub id: CatalogId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    /// Total chapters, 0 when unknown or still publishing.
    #[serde(default)]
    pub num_chapters: u32,
    /// Publishing status (e.g. "finished", "currently_publishing").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Mean user score (0-10).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
}

/// Reading status on the user's list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListStatus {
    Reading,
    Completed,
    OnHold,
    Dropped,
    PlanToRead,
}

impl ListStatus {
    /// Name used by the catalog API.
    pub fn api_name(&self) -> &'static str {
        match self {
            ListStatus::Reading => "reading",
            ListStatus::Completed => "completed",
            ListStatus::OnHold => "on_hold",
            ListStatus::Dropped => "dropped",
            ListStatus::PlanToRead => "plan_to_read",
        }
    }

    /// Numeric code stored in library backups.
    pub fn backup_code(&self) -> u32 {
        match self {
            ListStatus::Reading => 1,
            ListStatus::Completed => 2,
            ListStatus::OnHold => 3,
            ListStatus::Dropped => 4,
            ListStatus::PlanToRead => 6,
        }
    }

    /// Parse a backup code. Both 5 and 6 mean "plan to read".
    pub fn from_backup_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(ListStatus::Reading),
            2 => Some(ListStatus::Completed),
            3 => Some(ListStatus::OnHold),
            4 => Some(ListStatus::Dropped),
            5 | 6 => Some(ListStatus::PlanToRead),
            _ => None,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ListStatus::Reading => "Reading",
            ListStatus::Completed => "Completed",
            ListStatus::OnHold => "On Hold",
            ListStatus::Dropped => "Dropped",
            ListStatus::PlanToRead => "Plan to Read",
        }
    }
}

impl std::str::FromStr for ListStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "reading" => Ok(ListStatus::Reading),
            "completed" => Ok(ListStatus::Completed),
            "on_hold" => Ok(ListStatus::OnHold),
            "dropped" => Ok(ListStatus::Dropped),
            "plan_to_read" => Ok(ListStatus::PlanToRead),
            _ => Err(format!("unknown list status: {}", s)),
        }
    }
}

/// Changes to an existing tracking entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackingUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ListStatus>,
    /// Chapters read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters_read: Option<u32>,
    /// User score (1-10, 0 clears it).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}
