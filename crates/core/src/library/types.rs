//! Library data types.
//!
//! [`Backup`] and friends mirror the JSON backup layout and keep unknown
//! fields so a load/save cycle does not lose data. [`LibraryEntry`] is the
//! engine's read-only view of one title.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::{CatalogId, ListStatus};

/// Tracker identifier used in backups.
pub type SourceId = u32;

/// Tracker ID of MyAnimeList in Mihon backups.
pub const MYANIMELIST_SOURCE: SourceId = 1;

/// Identifies a library entry: by title first, by canonical reference when
/// the title is ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub title: String,
    /// Canonical reference (the entry's source URL).
    pub reference: String,
}

/// Link between a library entry and a remote catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    pub source_id: SourceId,
    pub media_id: CatalogId,
    pub status: ListStatus,
    pub score: u8,
    pub chapters_read: u32,
}

impl TrackingRecord {
    /// A fresh link as created by the tracking pass.
    pub fn plan_to_read(source_id: SourceId, media_id: CatalogId) -> Self {
        Self {
            source_id,
            media_id,
            status: ListStatus::PlanToRead,
            score: 0,
            chapters_read: 0,
        }
    }
}

/// One title of the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub title: String,
    pub reference: String,
    #[serde(default)]
    pub tracking: Vec<TrackingRecord>,
}

impl LibraryEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey {
            title: self.title.clone(),
            reference: self.reference.clone(),
        }
    }

    pub fn is_tracked_by(&self, source: SourceId) -> bool {
        self.tracking.iter().any(|t| t.source_id == source)
    }
}

// ============================================================================
// Backup file layout
// ============================================================================

/// Root of a JSON library backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(default)]
    pub backup_manga: Vec<BackupManga>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A manga in the backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManga {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub tracking: Vec<BackupTracking>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A tracker link in the backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupTracking {
    pub sync_id: SourceId,
    pub media_id: CatalogId,
    #[serde(default)]
    pub status: u32,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub last_chapter_read: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<&BackupTracking> for TrackingRecord {
    fn from(t: &BackupTracking) -> Self {
        TrackingRecord {
            source_id: t.sync_id,
            media_id: t.media_id,
            status: ListStatus::from_backup_code(t.status).unwrap_or(ListStatus::PlanToRead),
            score: t.score.clamp(0.0, 10.0).round() as u8,
            chapters_read: t.last_chapter_read.max(0.0).floor() as u32,
        }
    }
}

impl From<TrackingRecord> for BackupTracking {
    fn from(r: TrackingRecord) -> Self {
        BackupTracking {
            sync_id: r.source_id,
            media_id: r.media_id,
            status: r.status.backup_code(),
            score: f64::from(r.score),
            last_chapter_read: f64::from(r.chapters_read),
            extra: Map::new(),
        }
    }
}

impl From<&BackupManga> for LibraryEntry {
    fn from(m: &BackupManga) -> Self {
        LibraryEntry {
            title: m.title.clone(),
            reference: m.url.clone(),
            tracking: m.tracking.iter().map(TrackingRecord::from).collect(),
        }
    }
}
