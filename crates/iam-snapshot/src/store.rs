//! Snapshot files on disk.
//!
//! Layout: `<root>/<profile>/<PolicyName>`, one JSON file per policy. Names
//! are used verbatim.

use std::path::{Path, PathBuf};

use crate::error::{Result, SnapshotError};
use crate::policy::PolicyRecord;

/// Writes policy records under a fixed output root
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    /// Create a store rooted at `root`. Nothing is touched until a write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the profile's directory if it is missing and return its path.
    ///
    /// An existing directory is not an error, so repeated runs succeed.
    pub fn ensure_profile_dir(&self, profile: &str) -> Result<PathBuf> {
        let dir = self.root.join(profile);
        if !dir.is_dir() {
            std::fs::create_dir_all(&dir).map_err(|e| SnapshotError::filesystem(&dir, e))?;
            tracing::debug!(path = %dir.display(), "created profile directory");
        }
        Ok(dir)
    }

    /// Write `record` into `dir`, replacing any file of the same name.
    pub fn write_record(&self, dir: &Path, record: &PolicyRecord) -> Result<PathBuf> {
        let contents = record.to_json()?;
        let path = dir.join(&record.name);
        std::fs::write(&path, contents).map_err(|e| SnapshotError::filesystem(&path, e))?;
        tracing::debug!(path = %path.display(), "wrote policy snapshot");
        Ok(path)
    }
}
