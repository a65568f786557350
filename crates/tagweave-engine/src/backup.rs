//! Pre-write backup copies.
//!
//! The filesystem offers no multi-file transactions, so safety is per-document:
//! before any write the current content is saved under the backup directory
//! (mirroring the vault's relative layout), and a failed post-write validation
//! restores from exactly that copy.

use std::path::{Path, PathBuf};

use crate::EngineError;

#[derive(Debug)]
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn create(dir: PathBuf) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&dir).map_err(|e| EngineError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn backup_path(&self, rel_path: &str) -> PathBuf {
        self.dir.join(rel_path)
    }

    /// Save `content` as the pre-write copy for `rel_path`, replacing any earlier
    /// copy (the latest backup is always the latest pre-write state).
    pub fn save(&self, rel_path: &str, content: &str) -> Result<(), EngineError> {
        let path = self.backup_path(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }
        std::fs::write(&path, content).map_err(|e| EngineError::io(&path, e))
    }

    /// Copy the backup for `rel_path` back over `target`.
    pub fn restore(&self, rel_path: &str, target: &Path) -> Result<(), EngineError> {
        let path = self.backup_path(rel_path);
        std::fs::copy(&path, target)
            .map(|_| ())
            .map_err(|e| EngineError::io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::create(dir.path().join("backups")).unwrap();
        store.save("sub/note.md", "original").unwrap();

        let target = dir.path().join("note.md");
        std::fs::write(&target, "clobbered").unwrap();
        store.restore("sub/note.md", &target).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "original");
    }
}
