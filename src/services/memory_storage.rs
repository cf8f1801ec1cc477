use crate::services::storage::{ObjectMetadata, StorageService};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;

struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

/// Process-local disk. Used as the "memory" disk and as the fake disk in tests.
pub struct MemoryStorageService {
    files: Mutex<BTreeMap<String, StoredObject>>,
    base_url: String,
}

impl MemoryStorageService {
    pub fn new() -> Self {
        Self::with_base_url("memory://")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
            base_url: base_url.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overrides the modification time of a stored object.
    pub fn touch(&self, path: &str, at: DateTime<Utc>) -> bool {
        match self.lock().get_mut(path) {
            Some(object) => {
                object.last_modified = at;
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>> {
        // A poisoned map is still structurally valid.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStorageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MemoryStorageService {
    async fn put(&self, path: &str, data: Bytes, _content_type: &str) -> Result<String> {
        self.lock().insert(
            path.to_string(),
            StoredObject {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(path.to_string())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.lock()
            .get(path)
            .map(|object| object.data.to_vec())
            .ok_or_else(|| anyhow!("Key not found: {}", path))
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        Ok(self.lock().remove(path).is_some())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.lock().contains_key(path))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .lock()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get_object_metadata(&self, path: &str) -> Result<Option<ObjectMetadata>> {
        Ok(self.lock().get(path).map(|object| ObjectMetadata {
            last_modified: Some(object.last_modified),
            size: object.data.len() as i64,
        }))
    }
}
