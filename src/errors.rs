use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Per-job failure taxonomy. Each variant terminates the owning job's
/// pipeline but is never allowed to abort the run as a whole.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("pg_dump failed with {status}: {stderr}")]
    Dump { status: ExitStatus, stderr: String },

    #[error("backup archive {} is invalid or empty; check for errors above", .path.display())]
    InvalidArchive { path: PathBuf },

    #[error("upload to object storage failed: {cause}")]
    Upload { cause: String },

    #[error("failed to delete local archive {}: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
