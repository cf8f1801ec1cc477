use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttachmentError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Storage write failed for '{path}': {source}")]
    StorageWriteFailed {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Storage delete failed for '{path}': {source}")]
    StorageDeleteFailed {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Storage read failed for '{path}': {source}")]
    StorageReadFailed {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Record store error: {0}")]
    RecordStore(#[from] sea_orm::DbErr),

    #[error("Storage disk not configured: {0}")]
    StorageNotConfigured(String),
}

impl AttachmentError {
    /// Short machine-readable code, stable across message changes.
    pub fn code(&self) -> &'static str {
        match self {
            AttachmentError::InvalidPayload(_) => "INVALID_PAYLOAD",
            AttachmentError::StorageWriteFailed { .. } => "STORAGE_WRITE_FAILED",
            AttachmentError::StorageDeleteFailed { .. } => "STORAGE_DELETE_FAILED",
            AttachmentError::StorageReadFailed { .. } => "STORAGE_READ_FAILED",
            AttachmentError::RecordStore(_) => "RECORD_STORE_ERROR",
            AttachmentError::StorageNotConfigured(_) => "STORAGE_NOT_CONFIGURED",
        }
    }
}

pub type Result<T, E = AttachmentError> = std::result::Result<T, E>;
