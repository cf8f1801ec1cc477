#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use rust_attachments::entities::attachments;
use rust_attachments::infrastructure::database;
use rust_attachments::models::{OwnerRef, TypeFilter, UploadPayload};
use rust_attachments::services::memory_storage::MemoryStorageService;
use rust_attachments::services::record_store::{
    AttachmentChanges, NewAttachment, RecordStore, SeaOrmRecordStore,
};
use rust_attachments::services::storage::{ObjectMetadata, StorageService};
use sea_orm::{Database, DbErr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub async fn setup_records() -> Arc<SeaOrmRecordStore> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();
    Arc::new(SeaOrmRecordStore::new(db))
}

pub fn jpeg(name: &str) -> UploadPayload {
    // JPEG magic followed by filler.
    UploadPayload::new(name, None, vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F'])
}

pub fn text(name: &str, body: &str) -> UploadPayload {
    UploadPayload::new(name, Some("text/plain"), body.as_bytes().to_vec())
}

/// Keeps consecutive inserts apart on `created_at`.
pub async fn tick() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

/// Memory disk whose writes or deletes can be switched to fail.
pub struct FlakyStorage {
    pub inner: MemoryStorageService,
    pub fail_put: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self {
            inner: MemoryStorageService::new(),
            fail_put: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl StorageService for FlakyStorage {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> anyhow::Result<String> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(anyhow!("disk full"));
        }
        self.inner.put(path, data, content_type).await
    }

    async fn get(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        self.inner.get(path).await
    }

    async fn delete(&self, path: &str) -> anyhow::Result<bool> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(anyhow!("permission denied"));
        }
        self.inner.delete(path).await
    }

    async fn exists(&self, path: &str) -> anyhow::Result<bool> {
        self.inner.exists(path).await
    }

    fn url(&self, path: &str) -> String {
        self.inner.url(path)
    }

    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        self.inner.list(prefix).await
    }

    async fn get_object_metadata(&self, path: &str) -> anyhow::Result<Option<ObjectMetadata>> {
        self.inner.get_object_metadata(path).await
    }
}

/// Record store that rejects inserts and updates while switched on.
pub struct BrokenRecords {
    pub inner: Arc<SeaOrmRecordStore>,
    pub fail_writes: AtomicBool,
}

impl BrokenRecords {
    pub fn new(inner: Arc<SeaOrmRecordStore>) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
        }
    }

    fn check(&self) -> Result<(), DbErr> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbErr::Custom("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for BrokenRecords {
    async fn insert(&self, record: NewAttachment) -> Result<attachments::Model, DbErr> {
        self.check()?;
        self.inner.insert(record).await
    }

    async fn update(
        &self,
        id: &str,
        changes: AttachmentChanges,
    ) -> Result<attachments::Model, DbErr> {
        self.check()?;
        self.inner.update(id, changes).await
    }

    async fn delete(&self, id: &str) -> Result<Option<attachments::Model>, DbErr> {
        self.inner.delete(id).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<attachments::Model>, DbErr> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_owner(
        &self,
        owner: &OwnerRef,
        filter: &TypeFilter,
    ) -> Result<Vec<attachments::Model>, DbErr> {
        self.inner.find_by_owner(owner, filter).await
    }

    async fn find_by_path(&self, storage_path: &str) -> Result<Option<attachments::Model>, DbErr> {
        self.inner.find_by_path(storage_path).await
    }
}
