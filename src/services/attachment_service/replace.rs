use crate::entities::attachments;
use crate::error::Result;
use crate::models::{Owner, TypeFilter, UploadPayload};
use crate::services::events::AttachmentEvent;
use crate::services::record_store::AttachmentChanges;
use crate::utils::naming::normalize_type;

use super::AttachmentService;

impl AttachmentService {
    /// Puts `payload` into the (owner, type) slot.
    ///
    /// An empty slot behaves like `attach`. Otherwise the newest attachment
    /// in the slot is repointed at freshly written bytes and its old bytes
    /// are deleted once the record update has succeeded.
    pub async fn replace(
        &self,
        owner: &impl Owner,
        tag: Option<&str>,
        payload: UploadPayload,
    ) -> Result<attachments::Model> {
        let owner = owner.owner_ref();
        let tag = normalize_type(tag);

        let current = self
            .records
            .find_by_owner(&owner, &TypeFilter::of(tag.as_deref()))
            .await?
            .into_iter()
            .next();

        let Some(current) = current else {
            return self.store_new(&owner, payload, tag).await;
        };

        let new_path = self.write_bytes(&owner, &payload).await?;

        let changes = AttachmentChanges {
            storage_path: new_path.clone(),
            size_bytes: payload.size(),
            original_name: payload.original_name,
            mime_type: payload.mime_type,
        };

        let updated = match self.records.update(&current.id, changes).await {
            Ok(updated) => updated,
            Err(e) => {
                tracing::error!(
                    "❌ Failed to repoint attachment {} to {}: {}",
                    current.id,
                    new_path,
                    e
                );
                self.discard_bytes(&new_path).await;
                return Err(e.into());
            }
        };

        self.remove_bytes(&current.storage_path).await;

        tracing::info!(
            "🔁 Replaced attachment {} for {}: {} -> {}",
            updated.id,
            owner,
            current.storage_path,
            updated.storage_path
        );
        self.events.publish(AttachmentEvent::Replaced {
            attachment: updated.clone(),
            previous_path: current.storage_path,
        });

        Ok(updated)
    }
}
