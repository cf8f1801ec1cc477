pub mod config;
pub mod entities;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::infrastructure::{database, storage};
use crate::services::attachment_service::AttachmentService;
use crate::services::record_store::{RecordStore, SeaOrmRecordStore};
use crate::services::storage::StorageRegistry;
use crate::services::worker::OrphanSweeper;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub use crate::error::AttachmentError;
pub use crate::models::{AttachmentView, Owner, OwnerRef, TypeFilter, UploadPayload};
pub use crate::services::owner_lifecycle::{OwnerLifecycle, PendingUploads, RemovalKind};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: StorageRegistry,
    pub records: Arc<dyn RecordStore>,
    pub attachments: Arc<AttachmentService>,
    pub config: AppConfig,
}

impl AppState {
    /// Connects the database, registers the disks and wires the service.
    pub async fn build(config: AppConfig) -> anyhow::Result<Self> {
        let db = database::setup_database(&config.database_url).await?;
        let registry = storage::setup_storage(&config).await;
        let records: Arc<dyn RecordStore> = Arc::new(SeaOrmRecordStore::new(db.clone()));
        let attachments =
            AttachmentService::from_registry(records.clone(), &registry, &config.attachments)?;

        Ok(Self {
            db,
            storage: registry,
            records,
            attachments: Arc::new(attachments),
            config,
        })
    }

    pub fn sweeper(&self) -> OrphanSweeper {
        OrphanSweeper::new(
            self.records.clone(),
            self.attachments.storage().clone(),
            self.config.orphan_grace_hours,
        )
    }
}
