use crate::config::AppConfig;
use crate::services::local_storage::LocalStorageService;
use crate::services::memory_storage::MemoryStorageService;
use crate::services::storage::{S3StorageService, StorageRegistry};
use aws_sdk_s3::config::Region;
use std::sync::Arc;
use tracing::info;

/// Registers the disks available to this process: "public" (local
/// directory), "memory", and "s3" when an endpoint is configured.
pub async fn setup_storage(config: &AppConfig) -> StorageRegistry {
    info!("💾 Local Storage: {} ({})", config.local_root, config.public_url);

    let mut registry = StorageRegistry::new()
        .register(
            "public",
            Arc::new(LocalStorageService::new(
                &config.local_root,
                config.public_url.clone(),
            )),
        )
        .register("memory", Arc::new(MemoryStorageService::new()));

    if let Some(endpoint_url) = &config.s3_endpoint {
        registry = registry.register("s3", Arc::new(setup_s3(config, endpoint_url).await));
    }

    registry
}

async fn setup_s3(config: &AppConfig, endpoint_url: &str) -> S3StorageService {
    let access_key = config.s3_access_key.clone().unwrap_or_default();
    let secret_key = config.s3_secret_key.clone().unwrap_or_default();
    let bucket = config.s3_bucket.clone();

    info!("☁️  S3 Storage: {} (Bucket: {})", endpoint_url, bucket);

    let aws_config = aws_config::from_env()
        .endpoint_url(endpoint_url)
        .region(Region::new("us-east-1"))
        .credentials_provider(aws_sdk_s3::config::Credentials::new(
            access_key, secret_key, None, None, "static",
        ))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(true)
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);

    // Ensure bucket exists
    match s3_client.head_bucket().bucket(&bucket).send().await {
        Ok(_) => info!("✅ Bucket '{}' is ready", bucket),
        Err(_) => {
            info!("🪣 Bucket '{}' not found, creating...", bucket);
            if let Err(e) = s3_client.create_bucket().bucket(&bucket).send().await {
                tracing::error!("❌ Failed to create bucket '{}': {}", bucket, e);
            } else {
                info!("✅ Bucket '{}' created successfully", bucket);
            }
        }
    }

    S3StorageService::new(s3_client, bucket, endpoint_url.to_string())
}
