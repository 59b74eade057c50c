//! Scheduled Database Backup Tool
//!
//! Dumps each configured PostgreSQL database to a compressed archive,
//! validates it, uploads it to S3-compatible object storage and removes
//! the local copy. Intended to run unattended, one invocation per run.

// dbbackup/src/main.rs
mod backup;
mod config;
mod errors;
mod utils;

use anyhow::{Context, Result};
use config::AppConfig;
use std::process::ExitCode;

/// Main entry point for the backup tool
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    match run_app().await {
        Ok(_) => {
            println!("✅ DB backup complete.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    let app_config = AppConfig::load_from_env()
        .context("Failed to load backup configuration from environment")?;

    println!("🚀 Starting Backup Process...");
    backup::run_backup_flow(&app_config)
        .await
        .context("Backup process failed")?;
    Ok(())
}
