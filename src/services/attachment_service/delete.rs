use crate::entities::attachments;
use crate::error::Result;
use crate::models::{Owner, TypeFilter};
use crate::services::events::AttachmentEvent;

use super::{AttachmentService, PurgeReport};

impl AttachmentService {
    /// Deletes the record, then its bytes.
    ///
    /// The bytes removed are those of the row as it was deleted, so a stale
    /// copy of `attachment` (e.g. from before a `replace`) still cleans up
    /// the current object. Returns `false` when the record was already gone.
    /// A failed or missing object delete is logged; the record removal stands.
    pub async fn delete(&self, attachment: &attachments::Model) -> Result<bool> {
        let Some(removed) = self.records.delete(&attachment.id).await? else {
            tracing::warn!("Attachment {} was already deleted", attachment.id);
            return Ok(false);
        };

        self.remove_bytes(&removed.storage_path).await;

        tracing::info!(
            "🗑️ Deleted attachment {} ({})",
            removed.id,
            removed.storage_path
        );
        self.events.publish(AttachmentEvent::Deleted(removed));

        Ok(true)
    }

    /// Deletes every attachment of `owner`, continuing past individual
    /// failures. Safe to repeat; an owner without attachments yields 0.
    pub async fn delete_all_for(&self, owner: &impl Owner) -> Result<PurgeReport> {
        let owner = owner.owner_ref();
        let attachments = self.records.find_by_owner(&owner, &TypeFilter::Any).await?;

        let mut report = PurgeReport::default();
        for attachment in attachments {
            match self.delete(&attachment).await {
                Ok(true) => report.deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        "❌ Failed to delete attachment {} of {}: {}",
                        attachment.id,
                        owner,
                        e
                    );
                    report.failures.push((attachment.id, e));
                }
            }
        }

        tracing::info!(
            "🧹 Removed {} attachments of {} ({} failed)",
            report.deleted,
            owner,
            report.failures.len()
        );
        Ok(report)
    }
}
