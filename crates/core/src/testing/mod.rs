//! Testing utilities and mock implementations.
//!
//! Mocks for the catalog and library seams, so sessions can be driven end
//! to end without a network or a backup file.
//!
//! # Example
//!
//! ```rust,ignore
//! use shelfsync_core::testing::{fixtures, MockCatalog, MockLibraryStore};
//!
//! let catalog = MockCatalog::new();
//! catalog.set_results("Berserk", vec![fixtures::candidate(2, "Berserk")]).await;
//!
//! let library = MockLibraryStore::new(vec![fixtures::entry("Berserk")]);
//! ```

mod mock_catalog;
mod mock_library;

pub use mock_catalog::{MockCatalog, RecordedCatalogCall};
pub use mock_library::MockLibraryStore;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::{CatalogCandidate, CatalogDetails, CatalogId};
    use crate::library::{LibraryEntry, SourceId, TrackingRecord};

    /// A catalog candidate without alternative titles.
    pub fn candidate(id: CatalogId, title: &str) -> CatalogCandidate {
        CatalogCandidate::new(id, title)
    }

    /// A details record with reasonable defaults.
    pub fn details(id: CatalogId, title: &str, chapters: u32) -> CatalogDetails {
        CatalogDetails {
            id,
            title: title.to_string(),
            synopsis: Some(format!("A manga about {}.", title.to_lowercase())),
            num_chapters: chapters,
            status: Some("finished".to_string()),
            mean: Some(8.5),
            media_type: Some("manga".to_string()),
            start_date: Some("2000-01-01".to_string()),
            end_date: None,
            picture_url: None,
        }
    }

    /// An untracked library entry whose reference is derived from the title.
    pub fn entry(title: &str) -> LibraryEntry {
        LibraryEntry {
            title: title.to_string(),
            reference: format!("/manga/{}", title.to_lowercase().replace(' ', "-")),
            tracking: Vec::new(),
        }
    }

    /// A library entry already linked to `media_id` on `source`.
    pub fn tracked_entry(title: &str, source: SourceId, media_id: CatalogId) -> LibraryEntry {
        let mut entry = entry(title);
        entry
            .tracking
            .push(TrackingRecord::plan_to_read(source, media_id));
        entry
    }
}
