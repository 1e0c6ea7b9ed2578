//! Local library access.
//!
//! The engine reads untracked entries from a [`LibraryStore`], appends
//! tracking records to matched entries and persists the library once per
//! tracking pass.

mod json_store;
mod types;

pub use json_store::JsonBackupStore;
pub use types::*;

use thiserror::Error;

use crate::catalog::{CatalogId, TrackingUpdate};

/// Errors from library storage.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid backup: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Tracking record not found: source {source_id}, media {media_id}")]
    TrackingNotFound {
        source_id: SourceId,
        media_id: CatalogId,
    },

    #[error("Library has no backing file")]
    NoBackingFile,

    #[error("Library lock poisoned")]
    LockPoisoned,
}

/// Local library storage.
///
/// Calls are synchronous and cheap; the engine invokes them from worker
/// tasks, so implementations must be safe to share.
pub trait LibraryStore: Send + Sync {
    /// All entries, in library order.
    fn entries(&self) -> Result<Vec<LibraryEntry>, LibraryError>;

    /// Entries without a tracking record for `source`, in library order.
    fn list_untracked(&self, source: SourceId) -> Result<Vec<LibraryEntry>, LibraryError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| !e.is_tracked_by(source))
            .collect())
    }

    /// Append a tracking record to the entry identified by `key`.
    fn append_tracking(&self, key: &EntryKey, record: TrackingRecord) -> Result<(), LibraryError>;

    /// Apply `update` to every tracking record for (`source`, `media_id`).
    ///
    /// Returns the number of records changed.
    fn update_tracking(
        &self,
        source: SourceId,
        media_id: CatalogId,
        update: &TrackingUpdate,
    ) -> Result<usize, LibraryError>;

    /// Write pending changes to durable storage.
    fn persist(&self) -> Result<(), LibraryError>;
}

/// Find the entry for `key` among `(title, reference)` pairs.
///
/// A unique title match wins. Otherwise the reference decides, preferring
/// entries that also match the title. An ambiguous title with no matching
/// reference resolves to the first entry with that title.
pub fn locate_entry<'a, I>(key: &EntryKey, entries: I) -> Result<usize, LibraryError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut by_title = Vec::new();
    let mut by_reference = Vec::new();

    for (idx, (title, reference)) in entries.into_iter().enumerate() {
        let title_match = title == key.title;
        let reference_match = !key.reference.is_empty() && reference == key.reference;
        if title_match {
            by_title.push(idx);
        }
        if reference_match {
            by_reference.push((idx, title_match));
        }
    }

    if by_title.len() == 1 {
        return Ok(by_title[0]);
    }

    let reference_hit = by_reference
        .iter()
        .find(|(_, title_match)| *title_match)
        .or_else(|| by_reference.first())
        .map(|(idx, _)| *idx);

    reference_hit
        .or_else(|| by_title.first().copied())
        .ok_or_else(|| LibraryError::EntryNotFound(key.title.clone()))
}
