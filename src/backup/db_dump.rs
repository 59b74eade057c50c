// dbbackup/src/backup/db_dump.rs
use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStdout, Command};
use which::which;

use crate::backup::archive;
use crate::errors::BackupError;
use crate::utils::HumanReadableBytes;

/// Finds the pg_dump executable in the system PATH.
pub fn find_pg_dump_executable() -> Result<PathBuf> {
    which("pg_dump")
        .context("pg_dump executable not found in PATH. Please ensure PostgreSQL client tools are installed and in your PATH.")
}

/// Dumps one database to a gzip-compressed tar archive at `dest_path`.
///
/// Spawns `pg_dump --format=tar` and streams its standard output through a
/// gzip encoder directly into the destination file, so the archive never
/// has to fit in memory. Standard error is drained concurrently and decoded
/// lossily (pg_dump diagnostics are not guaranteed to be UTF-8 under every
/// locale); both pipes are closed before the child is reaped.
///
/// A non-zero exit status fails the stage. A zero exit status alone is not
/// trusted: the completed archive is handed to the validator before the
/// stage is declared complete (pg_dump can exit 0 while emitting nothing
/// if misconfigured). Stderr text alongside a zero exit is surfaced as a
/// warning annotated with the archive's file name.
pub async fn dump_to_file(
    pg_dump_path: &Path,
    db_url: &str,
    dest_path: &Path,
) -> Result<(), BackupError> {
    println!("Dumping DB to file...");

    if let Some(parent) = dest_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut child = Command::new(pg_dump_path)
        .arg(format!("--dbname={}", db_url))
        .arg("--format=tar")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdout = child.stdout.take().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pg_dump stdout not captured")
    })?;
    let mut stderr = child.stderr.take().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pg_dump stderr not captured")
    })?;

    let stderr_task = tokio::spawn(async move {
        let mut bytes = Vec::new();
        stderr.read_to_end(&mut bytes).await.map(|_| bytes)
    });

    let compress_result = compress_stream_to_file(&mut stdout, dest_path).await;
    if compress_result.is_err() {
        // The child may be blocked writing into a pipe nobody reads
        // anymore; stop it so both pipes close and it is reaped here.
        let _ = child.kill().await;
    }

    let stderr_bytes = stderr_task.await.map_err(std::io::Error::other)??;
    let status = child.wait().await?;
    compress_result?;

    let stderr_text = String::from_utf8_lossy(&stderr_bytes);

    if !status.success() {
        return Err(BackupError::Dump {
            status,
            stderr: stderr_text.trim_end().to_string(),
        });
    }

    // Exit 0 is not proof of a usable archive; validate before moving on.
    let size_bytes = archive::validate_archive(dest_path)?;
    println!("Backup archive file is valid");
    println!("Backup filesize: {}", HumanReadableBytes(size_bytes));

    // Not all stderr text is a critical error; surface it as a warning.
    if !stderr_text.trim().is_empty() {
        let archive_name = dest_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        eprintln!("{}", stderr_text.trim_end());
        eprintln!(
            "⚠️ Potential warnings detected; please ensure the backup file \"{}\" contains all needed data",
            archive_name
        );
    }

    println!("DB dumped to file...");
    Ok(())
}

/// Reads the dump stream to EOF, gzip-compressing it into `dest_path`.
async fn compress_stream_to_file(
    stdout: &mut ChildStdout,
    dest_path: &Path,
) -> std::io::Result<()> {
    let archive_file = File::create(dest_path)?;
    let mut encoder = GzEncoder::new(archive_file, Compression::default());
    let mut chunk = vec![0u8; 64 * 1024];
    loop {
        let n = stdout.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        encoder.write_all(&chunk[..n])?;
    }
    encoder.try_finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_dump_to_file_writes_valid_archive() -> anyhow::Result<()> {
        // `echo` stands in for pg_dump: exits 0 and emits at least one byte.
        let fake_pg_dump = which("echo")?;
        let dir = tempdir()?;
        let dest = dir.path().join("svc").join("20240305.tar.gz");

        dump_to_file(&fake_pg_dump, "postgres://localhost/db", &dest).await?;

        assert!(dest.is_file());
        assert!(archive::validate_archive(&dest)? > 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_dump_to_file_creates_missing_parent_dirs() -> anyhow::Result<()> {
        let fake_pg_dump = which("echo")?;
        let dir = tempdir()?;
        let dest = dir.path().join("a").join("b").join("out.tar.gz");

        dump_to_file(&fake_pg_dump, "postgres://localhost/db", &dest).await?;
        assert!(dest.is_file());
        Ok(())
    }

    #[tokio::test]
    async fn test_dump_to_file_nonzero_exit_is_dump_error() -> anyhow::Result<()> {
        // `false` exits non-zero without producing output.
        let fake_pg_dump = which("false")?;
        let dir = tempdir()?;
        let dest = dir.path().join("out.tar.gz");

        let err = dump_to_file(&fake_pg_dump, "postgres://localhost/db", &dest)
            .await
            .unwrap_err();
        match err {
            BackupError::Dump { status, .. } => assert!(!status.success()),
            other => panic!("expected Dump error, got: {}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_dump_to_file_empty_output_fails_validation() -> anyhow::Result<()> {
        // `true` exits 0 with no output: the archive decompresses to zero
        // bytes and must be rejected by validation, not uploaded.
        let fake_pg_dump = which("true")?;
        let dir = tempdir()?;
        let dest = dir.path().join("out.tar.gz");

        let err = dump_to_file(&fake_pg_dump, "postgres://localhost/db", &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::InvalidArchive { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_dump_to_file_tolerates_non_utf8_stderr() -> anyhow::Result<()> {
        // pg_dump diagnostics may not be UTF-8 under non-UTF-8 locales; a
        // successful dump with such stderr is still a success with a
        // warning, never a failure.
        let dir = tempdir()?;
        let script = dir.path().join("fake_pg_dump.sh");
        std::fs::write(
            &script,
            b"#!/bin/sh\nprintf 'tar data'\nprintf '\\377warnung' >&2\nexit 0\n",
        )?;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;

        let dest = dir.path().join("out.tar.gz");
        dump_to_file(&script, "postgres://localhost/db", &dest).await?;
        assert!(archive::validate_archive(&dest)? > 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_dump_to_file_compression_error_stops_child() -> anyhow::Result<()> {
        // `yes` streams output forever; the destination is an existing
        // directory, so creating the archive file fails immediately. The
        // dump must surface the I/O error and tear the child down instead
        // of waiting on a writer that never exits.
        let streaming_cmd = which("yes")?;
        let dir = tempdir()?;

        let err = dump_to_file(&streaming_cmd, "postgres://localhost/db", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Io(_)));
        Ok(())
    }
}
