use crate::entities::attachments;
use crate::error::{AttachmentError, Result};
use crate::models::{Owner, OwnerRef, UploadPayload};
use crate::services::events::AttachmentEvent;
use crate::services::record_store::NewAttachment;
use crate::utils::naming::{normalize_type, storage_path_for};
use crate::utils::validation::validate_payload;
use chrono::Utc;
use uuid::Uuid;

use super::{AttachmentService, BatchFailure, BatchOutcome};

impl AttachmentService {
    /// Stores `payload` as a new attachment of `owner`, optionally tagged.
    pub async fn attach(
        &self,
        owner: &impl Owner,
        payload: UploadPayload,
        tag: Option<&str>,
    ) -> Result<attachments::Model> {
        let owner = owner.owner_ref();
        self.store_new(&owner, payload, normalize_type(tag)).await
    }

    /// Attaches each payload independently; failures are collected.
    pub async fn attach_many(
        &self,
        owner: &impl Owner,
        payloads: Vec<UploadPayload>,
        tag: Option<&str>,
    ) -> BatchOutcome {
        let owner = owner.owner_ref();
        let tag = normalize_type(tag);
        let mut outcome = BatchOutcome::default();

        for (index, payload) in payloads.into_iter().enumerate() {
            let name = payload.original_name.clone();
            match self.store_new(&owner, payload, tag.clone()).await {
                Ok(model) => outcome.attached.push(model),
                Err(error) => {
                    tracing::warn!("Skipping '{}' for {}: {}", name, owner, error);
                    outcome.failures.push(BatchFailure { index, name, error });
                }
            }
        }

        tracing::info!(
            "📎 Attached {}/{} files to {}",
            outcome.attached.len(),
            outcome.attached.len() + outcome.failures.len(),
            owner
        );
        outcome
    }

    /// Validates the payload and writes its bytes under a fresh path.
    pub(crate) async fn write_bytes(
        &self,
        owner: &OwnerRef,
        payload: &UploadPayload,
    ) -> Result<String> {
        validate_payload(payload)?;

        let path = storage_path_for(&owner.kind, &payload.original_name);
        self.storage
            .put(&path, payload.data.clone(), &payload.mime_type)
            .await
            .map_err(|source| {
                tracing::error!("❌ Storage write failed for {}: {}", path, source);
                AttachmentError::StorageWriteFailed {
                    path: path.clone(),
                    source,
                }
            })?;

        Ok(path)
    }

    pub(crate) async fn store_new(
        &self,
        owner: &OwnerRef,
        payload: UploadPayload,
        tag: Option<String>,
    ) -> Result<attachments::Model> {
        let path = self.write_bytes(owner, &payload).await?;

        let record = NewAttachment {
            id: Uuid::new_v4().to_string(),
            owner: owner.clone(),
            tag,
            storage_path: path.clone(),
            size_bytes: payload.size(),
            original_name: payload.original_name,
            mime_type: payload.mime_type,
            created_at: Utc::now(),
        };

        match self.records.insert(record).await {
            Ok(model) => {
                tracing::info!(
                    "✅ Stored attachment {} ({}) for {} at {}",
                    model.id,
                    model.original_name,
                    owner,
                    model.storage_path
                );
                self.events.publish(AttachmentEvent::Stored(model.clone()));
                Ok(model)
            }
            Err(e) => {
                tracing::error!("❌ Failed to insert attachment record for {}: {}", path, e);
                self.discard_bytes(&path).await;
                Err(e.into())
            }
        }
    }
}
