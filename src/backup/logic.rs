// dbbackup/src/backup/logic.rs
use anyhow::{Context, Result};
use aws_sdk_s3 as s3;
use chrono::Local;
use std::path::{Path, PathBuf};

use crate::backup::{cleanup, db_dump, s3_upload};
use crate::config::{AppConfig, ServiceEntry};
use crate::errors::BackupError;
use crate::utils::redact_db_url;

/// One service's backup task for a run. Built at the start of the
/// service's iteration; its local archive is removed at the end of the
/// iteration regardless of outcome.
pub(crate) struct BackupJob {
    pub service_name: String,
    pub database_url: String,
    pub destination_key: String,
    pub local_path: PathBuf,
}

#[derive(Debug, PartialEq)]
pub(crate) enum JobOutcome {
    Success,
    Failed(String),
}

/// Per-run accounting: every attempted service with its final outcome.
#[derive(Default)]
pub(crate) struct RunSummary {
    entries: Vec<(String, JobOutcome)>,
}

impl RunSummary {
    fn record(&mut self, service_name: String, outcome: JobOutcome) {
        self.entries.push((service_name, outcome));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, outcome)| matches!(outcome, JobOutcome::Failed(_)))
            .count()
    }

    pub fn is_all_success(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn print(&self) {
        println!("Backup run summary:");
        for (service_name, outcome) in &self.entries {
            match outcome {
                JobOutcome::Success => println!("  ✅ {}", service_name),
                JobOutcome::Failed(reason) => println!("  ❌ {}: {}", service_name, reason),
            }
        }
    }
}

/// Derives the object-storage key for one service and run date.
pub(crate) fn destination_key(service_name: &str, date_stamp: &str) -> String {
    format!("{}/{}.tar.gz", service_name, date_stamp)
}

/// Builds one job per configured service. The local path mirrors the
/// destination key under the per-run temporary directory, so each service
/// gets its own subdirectory holding exactly one archive at a time.
pub(crate) fn build_jobs(
    services: &[ServiceEntry],
    date_stamp: &str,
    tmp_root: &Path,
) -> Vec<BackupJob> {
    services
        .iter()
        .map(|service| {
            let destination_key = destination_key(&service.name, date_stamp);
            BackupJob {
                service_name: service.name.clone(),
                database_url: service.database_url.clone(),
                local_path: tmp_root.join(&destination_key),
                destination_key,
            }
        })
        .collect()
}

/// Merges a job's pipeline result with its cleanup result into the final
/// outcome. A pipeline failure always wins over a cleanup failure; a
/// cleanup failure after a successful upload still fails the job, since a
/// leaked local archive is a reportable condition even though the remote
/// object is correct.
pub(crate) fn merge_job_outcome(
    pipeline: Result<(), BackupError>,
    cleanup: Result<(), BackupError>,
) -> JobOutcome {
    match (pipeline, cleanup) {
        (Ok(()), Ok(())) => JobOutcome::Success,
        (Err(e), _) => JobOutcome::Failed(e.to_string()),
        (Ok(()), Err(e)) => JobOutcome::Failed(e.to_string()),
    }
}

/// Runs one job's dump → validate → upload sequence. Validation is part
/// of the dump stage; any stage error skips the remaining stages. Cleanup
/// is handled by the caller so it runs no matter where this fails.
async fn run_job_pipeline(
    pg_dump_path: &Path,
    client: &s3::Client,
    bucket_name: &str,
    job: &BackupJob,
) -> Result<(), BackupError> {
    db_dump::dump_to_file(pg_dump_path, &job.database_url, &job.local_path).await?;
    s3_upload::upload_file_to_s3(client, bucket_name, &job.destination_key, &job.local_path)
        .await?;
    Ok(())
}

/// Drives each job through the given stage runner, sequentially and in
/// configuration order. A failed job never halts the loop; every job is
/// attempted, cleaned up exactly once, and accounted for in the summary.
pub(crate) async fn drive_jobs<F>(jobs: &[BackupJob], mut run_pipeline: F) -> RunSummary
where
    F: AsyncFnMut(&BackupJob) -> Result<(), BackupError>,
{
    let mut summary = RunSummary::default();
    for job in jobs {
        println!(
            "Initiating DB backup for {} (source: {})",
            job.service_name,
            redact_db_url(&job.database_url)
        );

        let pipeline_result = run_pipeline(job).await;
        if let Err(e) = &pipeline_result {
            eprintln!("❌ Backup for {} failed: {}", job.service_name, e);
        }

        // Cleanup runs exactly once per job, whatever happened upstream.
        let cleanup_result = cleanup::remove_local_archive(&job.local_path);
        if let Err(e) = &cleanup_result {
            eprintln!("⚠️ Cleanup for {} failed: {}", job.service_name, e);
        }

        let outcome = merge_job_outcome(pipeline_result, cleanup_result);
        if outcome == JobOutcome::Success {
            println!("DB backup for {} complete...", job.service_name);
        }
        summary.record(job.service_name.clone(), outcome);
    }
    summary
}

/// Drives every configured service's pipeline for one run.
pub(crate) async fn perform_backup_run(app_config: &AppConfig) -> Result<RunSummary> {
    let pg_dump_path = db_dump::find_pg_dump_executable()?;
    println!("Found pg_dump executable at: {}", pg_dump_path.display());

    // The run date is captured once so a run spanning midnight stays
    // internally consistent across services.
    let date_stamp = Local::now().format("%Y%m%d").to_string();

    let run_tmp = tempfile::Builder::new()
        .prefix("dbbackup_")
        .tempdir()
        .context("Failed to create per-run temporary directory")?;

    let jobs = build_jobs(&app_config.services, &date_stamp, run_tmp.path());
    println!("Initiating DB backup for {} services", jobs.len());

    let client = s3_upload::create_client(&app_config.spaces).await;

    let summary = drive_jobs(&jobs, async |job: &BackupJob| {
        run_job_pipeline(&pg_dump_path, &client, &app_config.spaces.bucket_name, job).await
    })
    .await;

    Ok(summary)
}
