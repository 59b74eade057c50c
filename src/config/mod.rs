// dbbackup/src/config/mod.rs
use anyhow::{Context, Result};
use std::env;

/// Connection settings for an S3-compatible object storage service
/// (AWS S3, DigitalOcean Spaces, MinIO, ...).
#[derive(Debug, Clone)]
pub struct SpacesConfig {
    pub endpoint_url: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
}

/// One configured service: a canonical name and the connection string of
/// the database to back up. The name is already resolved (explicit name or
/// positional fallback), so downstream code never re-derives it.
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    pub name: String,
    pub database_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub services: Vec<ServiceEntry>,
    pub spaces: SpacesConfig,
}

impl AppConfig {
    /// Loads the whole run configuration from environment variables, once,
    /// into an immutable value passed into the orchestrator.
    ///
    /// `BACKUP_DATABASE_URLS` and `SERVICE_NAMES` are comma-separated and
    /// paired positionally; a missing or blank name at index `i` falls back
    /// to the string `i + 1`.
    pub fn load_from_env() -> Result<Self> {
        let urls_raw = env::var("BACKUP_DATABASE_URLS")
            .context("BACKUP_DATABASE_URLS must be set (comma-separated connection strings)")?;
        let database_urls: Vec<String> = urls_raw
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();
        if database_urls.iter().all(|url| url.is_empty()) {
            anyhow::bail!("BACKUP_DATABASE_URLS contains no connection strings");
        }

        let names_raw = env::var("SERVICE_NAMES").unwrap_or_default();
        let names = resolve_service_names(&names_raw, database_urls.len());

        let services = names
            .into_iter()
            .zip(database_urls)
            .map(|(name, database_url)| ServiceEntry { name, database_url })
            .collect();

        let spaces = SpacesConfig {
            bucket_name: require_env("AWS_S3_BUCKET")?,
            region: require_env("AWS_S3_REGION")?,
            endpoint_url: require_env("AWS_S3_ENDPOINT")?,
            access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
        };

        Ok(AppConfig { services, spaces })
    }
}

fn require_env(key: &str) -> Result<String> {
    let value = env::var(key).with_context(|| format!("{} must be set", key))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} is set but empty", key);
    }
    Ok(value)
}

/// Resolves one canonical service name per configured database.
///
/// Names come from the comma-separated `raw` list, trimmed; any index with
/// no entry or a blank entry resolves to its 1-based position as a string.
pub(crate) fn resolve_service_names(raw: &str, count: usize) -> Vec<String> {
    let provided: Vec<&str> = raw.split(',').map(str::trim).collect();
    (0..count)
        .map(|i| match provided.get(i) {
            Some(name) if !name.is_empty() => (*name).to_string(),
            _ => (i + 1).to_string(),
        })
        .collect()
}
