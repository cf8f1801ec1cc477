use crate::config::AttachmentConfig;
use crate::error::AttachmentError;
use crate::services::events::{AttachmentEvent, EventBus};
use crate::services::record_store::RecordStore;
use crate::services::storage::{StorageRegistry, StorageService};
use std::sync::Arc;
use tokio::sync::broadcast;

pub mod attach;
pub mod delete;
pub mod query;
pub mod replace;
pub mod types;

pub use types::{BatchFailure, BatchOutcome, PurgeReport};

/// Keeps attachment rows and stored bytes consistent.
///
/// Writes go bytes first, record second; deletes go record first, bytes
/// second. A failure between the two steps can leave an unreferenced object
/// in storage but never a row pointing at missing bytes.
pub struct AttachmentService {
    records: Arc<dyn RecordStore>,
    storage: Arc<dyn StorageService>,
    events: EventBus,
}

impl AttachmentService {
    pub fn new(records: Arc<dyn RecordStore>, storage: Arc<dyn StorageService>) -> Self {
        Self {
            records,
            storage,
            events: EventBus::new(),
        }
    }

    /// Builds the service on the disk named by `config.storage_disk`.
    pub fn from_registry(
        records: Arc<dyn RecordStore>,
        registry: &StorageRegistry,
        config: &AttachmentConfig,
    ) -> Result<Self, AttachmentError> {
        let storage = registry.disk(&config.storage_disk)?;
        tracing::info!("📦 Attachments stored on disk '{}'", config.storage_disk);
        Ok(Self::new(records, storage))
    }

    pub fn storage(&self) -> &Arc<dyn StorageService> {
        &self.storage
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AttachmentEvent> {
        self.events.subscribe()
    }

    /// Best-effort removal of bytes that no record references (or will).
    pub(crate) async fn discard_bytes(&self, path: &str) {
        match self.storage.delete(path).await {
            Ok(_) => tracing::debug!("Discarded unreferenced object {}", path),
            Err(source) => {
                let err = AttachmentError::StorageDeleteFailed {
                    path: path.to_string(),
                    source,
                };
                tracing::warn!("⚠️ Orphan left in storage: {}", err);
            }
        }
    }

    /// Removes the bytes of a record that is already gone. Failures only
    /// leave an orphan object, so they are logged rather than returned.
    pub(crate) async fn remove_bytes(&self, path: &str) {
        match self.storage.delete(path).await {
            Ok(true) => tracing::debug!("Deleted object {}", path),
            Ok(false) => tracing::warn!("Object {} was already missing from storage", path),
            Err(source) => {
                let err = AttachmentError::StorageDeleteFailed {
                    path: path.to_string(),
                    source,
                };
                tracing::warn!("⚠️ {}", err);
            }
        }
    }
}
