//! Mock library store for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::catalog::{CatalogId, TrackingUpdate};
use crate::library::{
    locate_entry, EntryKey, LibraryEntry, LibraryError, LibraryStore, SourceId, TrackingRecord,
};

/// In-memory implementation of the LibraryStore trait.
///
/// Records appends and persists for assertions, and can be told to fail
/// persisting or appending to specific titles.
#[derive(Debug, Default)]
pub struct MockLibraryStore {
    entries: Arc<Mutex<Vec<LibraryEntry>>>,
    appended: Arc<Mutex<Vec<(EntryKey, TrackingRecord)>>>,
    failing_titles: Arc<Mutex<Vec<String>>>,
    persist_calls: Arc<AtomicUsize>,
    fail_persist: Arc<AtomicBool>,
}

impl MockLibraryStore {
    pub fn new(entries: Vec<LibraryEntry>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
            ..Default::default()
        }
    }

    /// Make every subsequent `persist` fail.
    pub fn fail_persist(&self) {
        self.fail_persist.store(true, Ordering::SeqCst);
    }

    /// Make appends to the entry titled `title` fail.
    pub fn fail_append(&self, title: &str) {
        lock(&self.failing_titles).push(title.to_string());
    }

    /// Appended records in call order.
    pub fn appended(&self) -> Vec<(EntryKey, TrackingRecord)> {
        lock(&self.appended).clone()
    }

    pub fn persist_count(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl LibraryStore for MockLibraryStore {
    fn entries(&self) -> Result<Vec<LibraryEntry>, LibraryError> {
        Ok(lock(&self.entries).clone())
    }

    fn append_tracking(&self, key: &EntryKey, record: TrackingRecord) -> Result<(), LibraryError> {
        if lock(&self.failing_titles).contains(&key.title) {
            return Err(LibraryError::Io(std::io::Error::other("injected append failure")));
        }

        let mut entries = lock(&self.entries);
        let idx = locate_entry(
            key,
            entries.iter().map(|e| (e.title.as_str(), e.reference.as_str())),
        )?;
        entries[idx].tracking.push(record.clone());
        lock(&self.appended).push((key.clone(), record));
        Ok(())
    }

    fn update_tracking(
        &self,
        source: SourceId,
        media_id: CatalogId,
        update: &TrackingUpdate,
    ) -> Result<usize, LibraryError> {
        let mut entries = lock(&self.entries);
        let mut changed = 0;
        for record in entries
            .iter_mut()
            .flat_map(|e| e.tracking.iter_mut())
            .filter(|t| t.source_id == source && t.media_id == media_id)
        {
            if let Some(status) = update.status {
                record.status = status;
            }
            if let Some(chapters) = update.chapters_read {
                record.chapters_read = chapters;
            }
            if let Some(score) = update.score {
                record.score = score;
            }
            changed += 1;
        }

        if changed == 0 {
            return Err(LibraryError::TrackingNotFound {
                source_id: source,
                media_id,
            });
        }
        Ok(changed)
    }

    fn persist(&self) -> Result<(), LibraryError> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(LibraryError::Io(std::io::Error::other("injected persist failure")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::MYANIMELIST_SOURCE;
    use crate::testing::fixtures;

    #[test]
    fn test_append_marks_entry_tracked() {
        let store = MockLibraryStore::new(vec![
            fixtures::entry("Berserk"),
            fixtures::entry("Monster"),
        ]);

        let key = fixtures::entry("Monster").key();
        store
            .append_tracking(&key, TrackingRecord::plan_to_read(MYANIMELIST_SOURCE, 1))
            .unwrap();

        assert_eq!(store.list_untracked(MYANIMELIST_SOURCE).unwrap().len(), 1);
        assert_eq!(store.appended().len(), 1);
    }

    #[test]
    fn test_failure_injection() {
        let store = MockLibraryStore::new(vec![fixtures::entry("Berserk")]);
        store.fail_append("Berserk");
        store.fail_persist();

        let key = fixtures::entry("Berserk").key();
        assert!(store.append_tracking(&key, TrackingRecord::plan_to_read(1, 1)).is_err());
        assert!(store.persist().is_err());
        assert_eq!(store.persist_count(), 1);
        assert!(store.appended().is_empty());
    }
}
