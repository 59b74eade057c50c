// dbbackup/src/backup/archive.rs
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::errors::BackupError;

/// Checks that a completed archive holds real content before it may be
/// uploaded.
///
/// Decompresses the first byte of the gzip stream; an archive that yields
/// zero decompressed bytes, or that fails to decompress at all, is invalid.
/// On success returns the archive's on-disk size in bytes for reporting.
pub fn validate_archive(archive_path: &Path) -> Result<u64, BackupError> {
    let archive_file = File::open(archive_path)?;
    let mut decoder = GzDecoder::new(archive_file);

    let mut first_byte = [0u8; 1];
    match decoder.read(&mut first_byte) {
        Ok(n) if n >= 1 => {}
        _ => {
            return Err(BackupError::InvalidArchive {
                path: archive_path.to_path_buf(),
            });
        }
    }

    let size_bytes = std::fs::metadata(archive_path)?.len();
    Ok(size_bytes)
}
