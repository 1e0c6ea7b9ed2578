//! Library backed by a JSON backup file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info};

use super::types::{Backup, BackupTracking, EntryKey, LibraryEntry, SourceId, TrackingRecord};
use super::{locate_entry, LibraryError, LibraryStore};
use crate::catalog::{CatalogId, TrackingUpdate};

/// A library loaded from a JSON backup.
///
/// Changes stay in memory until [`LibraryStore::persist`] writes the whole
/// document back, replacing the file atomically.
#[derive(Debug)]
pub struct JsonBackupStore {
    path: Option<PathBuf>,
    backup: RwLock<Backup>,
}

impl JsonBackupStore {
    /// Load the backup at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let backup: Backup = serde_json::from_str(&contents)?;
        info!(
            "Loaded library from {} ({} entries)",
            path.display(),
            backup.backup_manga.len()
        );
        Ok(Self {
            path: Some(path.to_path_buf()),
            backup: RwLock::new(backup),
        })
    }

    /// Wrap an in-memory backup. Persisting it fails with `NoBackingFile`.
    pub fn from_backup(backup: Backup) -> Self {
        Self {
            path: None,
            backup: RwLock::new(backup),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the current document.
    pub fn snapshot(&self) -> Result<Backup, LibraryError> {
        Ok(self
            .backup
            .read()
            .map_err(|_| LibraryError::LockPoisoned)?
            .clone())
    }
}

impl LibraryStore for JsonBackupStore {
    fn entries(&self) -> Result<Vec<LibraryEntry>, LibraryError> {
        let backup = self.backup.read().map_err(|_| LibraryError::LockPoisoned)?;
        Ok(backup.backup_manga.iter().map(LibraryEntry::from).collect())
    }

    fn append_tracking(&self, key: &EntryKey, record: TrackingRecord) -> Result<(), LibraryError> {
        let mut backup = self.backup.write().map_err(|_| LibraryError::LockPoisoned)?;
        let idx = locate_entry(
            key,
            backup
                .backup_manga
                .iter()
                .map(|m| (m.title.as_str(), m.url.as_str())),
        )?;

        debug!(
            "Appending tracking {}:{} to '{}'",
            record.source_id, record.media_id, backup.backup_manga[idx].title
        );
        backup.backup_manga[idx]
            .tracking
            .push(BackupTracking::from(record));
        Ok(())
    }

    fn update_tracking(
        &self,
        source: SourceId,
        media_id: CatalogId,
        update: &TrackingUpdate,
    ) -> Result<usize, LibraryError> {
        let mut backup = self.backup.write().map_err(|_| LibraryError::LockPoisoned)?;
        let mut changed = 0;

        for tracking in backup
            .backup_manga
            .iter_mut()
            .flat_map(|m| m.tracking.iter_mut())
            .filter(|t| t.sync_id == source && t.media_id == media_id)
        {
            if let Some(status) = update.status {
                tracking.status = status.backup_code();
            }
            if let Some(chapters) = update.chapters_read {
                tracking.last_chapter_read = f64::from(chapters);
            }
            if let Some(score) = update.score {
                tracking.score = f64::from(score);
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
        let path = self.path.as_ref().ok_or(LibraryError::NoBackingFile)?;
        let contents = {
            let backup = self.backup.read().map_err(|_| LibraryError::LockPoisoned)?;
            serde_json::to_string_pretty(&*backup)?
        };

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;
        info!("Saved library to {}", path.display());
        Ok(())
    }
}
