// dbbackup/src/backup/s3_upload.rs
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::error::DisplayErrorContext;
use s3::primitives::ByteStream;
use std::path::Path;

use crate::config::SpacesConfig;
use crate::errors::BackupError;

/// Builds the S3 client once per run; the same client is reused for every
/// service's upload (it is stateless with respect to individual uploads).
pub async fn create_client(spaces_config: &SpacesConfig) -> s3::Client {
    let sdk_config = aws_config::defaults(s3::config::BehaviorVersion::latest())
        .endpoint_url(&spaces_config.endpoint_url)
        .region(Region::new(spaces_config.region.clone()))
        .credentials_provider(s3::config::Credentials::new(
            &spaces_config.access_key_id,
            &spaces_config.secret_access_key,
            None,     // session_token
            None,     // expiry
            "Static", // provider_name
        ))
        .load()
        .await;

    s3::Client::new(&sdk_config)
}

/// Streams a local file to the bucket at the given key.
///
/// The body is streamed from disk, so archives larger than available
/// memory upload fine. No internal retry; retry policy belongs to the
/// external scheduler.
pub async fn upload_file_to_s3(
    client: &s3::Client,
    bucket_name: &str,
    s3_key: &str,
    file_path: &Path,
) -> Result<(), BackupError> {
    println!(
        "Uploading backup to S3... (bucket {}, key {})",
        bucket_name, s3_key
    );

    let body = ByteStream::from_path(file_path).await.map_err(|e| {
        BackupError::Upload {
            cause: format!(
                "failed to open {} for streaming: {}",
                file_path.display(),
                e
            ),
        }
    })?;

    client
        .put_object()
        .bucket(bucket_name)
        .key(s3_key)
        .body(body)
        .send()
        .await
        .map_err(|e| BackupError::Upload {
            cause: format!("{}", DisplayErrorContext(&e)),
        })?;

    println!("Backup uploaded to S3...");
    Ok(())
}
