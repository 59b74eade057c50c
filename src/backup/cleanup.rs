// dbbackup/src/backup/cleanup.rs
use std::path::Path;

use crate::errors::BackupError;

/// Removes the job's local archive once the job reaches its terminal
/// state, whether or not the upload succeeded.
///
/// The reported outcome is the real filesystem result: a missing file or
/// a permission error is a `Cleanup` failure carrying the path.
pub fn remove_local_archive(local_path: &Path) -> Result<(), BackupError> {
    println!("Deleting file...");
    std::fs::remove_file(local_path).map_err(|source| BackupError::Cleanup {
        path: local_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_remove_existing_archive() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("20240305.tar.gz");
        std::fs::write(&path, b"archive bytes")?;

        remove_local_archive(&path)?;
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_remove_missing_archive_reports_cleanup_error() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("never_created.tar.gz");

        let err = remove_local_archive(&path).unwrap_err();
        match err {
            BackupError::Cleanup { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected Cleanup error, got: {}", other),
        }
        Ok(())
    }
}
