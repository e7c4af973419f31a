use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use tempfile::NamedTempFile;

use crate::error_handling::types::StorageError;
use crate::storage::snapshot::Snapshot;

/// A snapshot file on disk, written and read as a whole.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Overwrites the file with `snapshot`.
    ///
    /// The bytes go to a temporary file next to the target which then replaces it, so a
    /// reader never sees a half-written snapshot.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let bytes = snapshot.encode()?;
        let dir = self.parent_dir();
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| {
            error!("Failed to create temporary file in {}: {}", dir.display(), e);
            StorageError::WriteFailed(e.to_string())
        })?;
        tmp.write_all(&bytes).map_err(|e| {
            error!("Failed to write snapshot {}: {}", self.path.display(), e);
            StorageError::WriteFailed(e.to_string())
        })?;
        tmp.as_file().sync_all().map_err(|e| {
            error!("Failed to sync snapshot {}: {}", self.path.display(), e);
            StorageError::WriteFailed(e.to_string())
        })?;
        tmp.persist(&self.path).map_err(|e| {
            error!("Failed to replace snapshot {}: {}", self.path.display(), e.error);
            StorageError::WriteFailed(e.error.to_string())
        })?;
        info!(
            "Saved {} session(s) to {}",
            snapshot.sessions.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn load(&self) -> Result<Snapshot, StorageError> {
        let bytes = fs::read(&self.path).map_err(|e| {
            error!("Failed to read snapshot {}: {}", self.path.display(), e);
            StorageError::ReadFailed(e.to_string())
        })?;
        let snapshot = Snapshot::decode(&bytes).map_err(|e| {
            error!("Invalid snapshot {}: {}", self.path.display(), e);
            e
        })?;
        debug!(
            "Read {} session(s) from {}",
            snapshot.sessions.len(),
            self.path.display()
        );
        Ok(snapshot)
    }
}
