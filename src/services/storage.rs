use crate::error::AttachmentError;
use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

pub struct ObjectMetadata {
    pub last_modified: Option<DateTime<Utc>>,
    pub size: i64,
}

/// Path-addressed byte store.
///
/// Separate calls share no transaction; callers order their writes and
/// deletes so that a failure between two calls leaves at worst an
/// unreferenced object behind.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Writes `data` at `path`, returning the stored path.
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<String>;
    async fn get(&self, path: &str) -> Result<Vec<u8>>;
    /// Returns `false` when nothing was stored at `path`.
    async fn delete(&self, path: &str) -> Result<bool>;
    async fn exists(&self, path: &str) -> Result<bool>;
    fn url(&self, path: &str) -> String;
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
    async fn get_object_metadata(&self, path: &str) -> Result<Option<ObjectMetadata>>;
}

/// Named storage disks, resolved from the configured disk name.
#[derive(Clone, Default)]
pub struct StorageRegistry {
    disks: HashMap<String, Arc<dyn StorageService>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: impl Into<String>, disk: Arc<dyn StorageService>) -> Self {
        self.disks.insert(name.into(), disk);
        self
    }

    pub fn disk(&self, name: &str) -> Result<Arc<dyn StorageService>, AttachmentError> {
        self.disks
            .get(name)
            .cloned()
            .ok_or_else(|| AttachmentError::StorageNotConfigured(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.disks.keys().cloned().collect();
        names.sort();
        names
    }
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String, public_url: String) -> Self {
        Self {
            client,
            bucket,
            public_url,
        }
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await?;
        Ok(path.to_string())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await?;
        let data = res.body.collect().await?.to_vec();
        Ok(data)
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        // DeleteObject succeeds for missing keys, so existence is checked first.
        if !self.exists(path).await? {
            return Ok(false);
        }

        let res = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await;

        if let Err(e) = res {
            tracing::error!(
                "S3 delete_object failed: bucket={}, key={}, error={:?}",
                self.bucket,
                path,
                e
            );
            return Err(e.into());
        }
        Ok(true)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow::anyhow!(service_error))
                }
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_url.trim_end_matches('/'),
            self.bucket,
            path
        )
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await?;

            if let Some(contents) = res.contents {
                for object in contents {
                    if let Some(key) = object.key {
                        objects.push(key);
                    }
                }
            }

            if res.is_truncated.unwrap_or(false) {
                continuation_token = res.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(objects)
    }

    async fn get_object_metadata(&self, path: &str) -> Result<Option<ObjectMetadata>> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    return Ok(None);
                }
                return Err(anyhow::anyhow!(service_error));
            }
        };

        let last_modified = res
            .last_modified
            .and_then(|d| DateTime::from_timestamp(d.secs(), d.subsec_nanos()));

        Ok(Some(ObjectMetadata {
            last_modified,
            size: res.content_length.unwrap_or(0),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_storage::MemoryStorageService;

    #[test]
    fn test_registry_resolves_named_disk() {
        let registry = StorageRegistry::new()
            .register("memory", Arc::new(MemoryStorageService::new()))
            .register("public", Arc::new(MemoryStorageService::new()));

        assert!(registry.disk("public").is_ok());
        assert_eq!(registry.names(), vec!["memory", "public"]);
    }

    #[test]
    fn test_registry_unknown_disk() {
        let registry = StorageRegistry::new();
        let err = registry.disk("s3").err().unwrap();
        assert!(matches!(err, AttachmentError::StorageNotConfigured(ref name) if name == "s3"));
    }
}
