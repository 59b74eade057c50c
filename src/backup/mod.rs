mod logic;
pub(crate) mod s3_upload; // S3 interactions (client + streaming upload)
pub(crate) mod archive;   // archive validation
pub(crate) mod cleanup;   // local artifact removal
pub(crate) mod db_dump;   // pg_dump + gzip stage

use anyhow::Result;
use crate::config::AppConfig;

/// Public entry point for the backup process.
///
/// Runs every configured service's pipeline to completion, prints the
/// per-run summary, and fails if one or more jobs failed (partial success
/// is visible in the summary but is not overall success).
pub async fn run_backup_flow(app_config: &AppConfig) -> Result<()> {
    let summary = logic::perform_backup_run(app_config).await?;
    summary.print();

    if !summary.is_all_success() {
        anyhow::bail!(
            "{} of {} backup jobs failed",
            summary.failed_count(),
            summary.len()
        );
    }
    Ok(())
}
