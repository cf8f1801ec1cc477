use std::env;

/// Attachment core configuration.
///
/// The core only needs to know which storage disk to write to; the name is
/// resolved against the [`StorageRegistry`](crate::services::storage::StorageRegistry)
/// built by the host.
#[derive(Debug, Clone)]
pub struct AttachmentConfig {
    /// Storage disk name (default: "public")
    pub storage_disk: String,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            storage_disk: "public".to_string(),
        }
    }
}

impl AttachmentConfig {
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            storage_disk: env::var("UPLOAD_STORAGE_DISK")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default.storage_disk),
        }
    }
}

/// Infrastructure settings used by the binary to build the database
/// connection and the storage disks.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub attachments: AttachmentConfig,

    /// Database URL (default: "sqlite://attachments.db?mode=rwc")
    pub database_url: String,

    /// Root directory of the local "public" disk (default: "storage/public")
    pub local_root: String,

    /// Base URL prepended to paths on the local disk (default: "/storage")
    pub public_url: String,

    /// S3 endpoint; the "s3" disk is only registered when this is set
    pub s3_endpoint: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,

    /// S3 bucket (default: "attachments")
    pub s3_bucket: String,

    /// Minimum age of an unreferenced object before the sweep removes it (default: 24)
    pub orphan_grace_hours: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            attachments: AttachmentConfig::default(),
            database_url: "sqlite://attachments.db?mode=rwc".to_string(),
            local_root: "storage/public".to_string(),
            public_url: "/storage".to_string(),
            s3_endpoint: None,
            s3_access_key: None,
            s3_secret_key: None,
            s3_bucket: "attachments".to_string(),
            orphan_grace_hours: 24,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            attachments: AttachmentConfig::from_env(),

            database_url: env::var("DATABASE_URL").unwrap_or(default.database_url),

            local_root: env::var("STORAGE_LOCAL_ROOT").unwrap_or(default.local_root),

            public_url: env::var("STORAGE_PUBLIC_URL").unwrap_or(default.public_url),

            s3_endpoint: env::var("MINIO_ENDPOINT").ok(),
            s3_access_key: env::var("MINIO_ACCESS_KEY").ok(),
            s3_secret_key: env::var("MINIO_SECRET_KEY").ok(),
            s3_bucket: env::var("MINIO_BUCKET").unwrap_or(default.s3_bucket),

            orphan_grace_hours: env::var("ORPHAN_GRACE_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.orphan_grace_hours),
        }
    }

    /// In-memory database and in-memory disk, for local experiments
    pub fn development() -> Self {
        Self {
            attachments: AttachmentConfig {
                storage_disk: "memory".to_string(),
            },
            database_url: "sqlite::memory:".to_string(),
            orphan_grace_hours: 0,
            ..Self::default()
        }
    }
}
