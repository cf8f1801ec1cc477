use crate::services::storage::{ObjectMetadata, StorageService};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Disk rooted at a local directory; paths map to files below `root`.
pub struct LocalStorageService {
    root: PathBuf,
    base_url: String,
}

impl LocalStorageService {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if path.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("Invalid storage path: {}", path);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn put(&self, path: &str, data: Bytes, _content_type: &str) -> Result<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&target).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        file.sync_all().await?;

        Ok(path.to_string())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.resolve(path)?;
        tokio::fs::read(&target)
            .await
            .map_err(|e| anyhow!("Failed to read {}: {}", path, e))
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&target).await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut objects = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }

                let relative = path
                    .strip_prefix(&self.root)?
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");

                if relative.starts_with(prefix) {
                    objects.push(relative);
                }
            }
        }

        objects.sort();
        Ok(objects)
    }

    async fn get_object_metadata(&self, path: &str) -> Result<Option<ObjectMetadata>> {
        let target = self.resolve(path)?;
        let metadata = match tokio::fs::metadata(&target).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(ObjectMetadata {
            last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            size: metadata.len() as i64,
        }))
    }
}
