use crate::entities::attachments;
use crate::error::{AttachmentError, Result};
use crate::models::{AttachmentView, Owner, TypeFilter};

use super::AttachmentService;

impl AttachmentService {
    /// Attachments of `owner` matching `filter`, newest first.
    pub async fn list_for(
        &self,
        owner: &impl Owner,
        filter: TypeFilter,
    ) -> Result<Vec<attachments::Model>> {
        let owner = owner.owner_ref();
        Ok(self.records.find_by_owner(&owner, &filter).await?)
    }

    /// The newest attachment in the (owner, type) slot.
    pub async fn current(
        &self,
        owner: &impl Owner,
        tag: Option<&str>,
    ) -> Result<Option<attachments::Model>> {
        Ok(self
            .list_for(owner, TypeFilter::of(tag))
            .await?
            .into_iter()
            .next())
    }

    pub async fn find(&self, id: &str) -> Result<Option<attachments::Model>> {
        Ok(self.records.find_by_id(id).await?)
    }

    /// Stored bytes of an attachment.
    pub async fn read(&self, attachment: &attachments::Model) -> Result<Vec<u8>> {
        self.storage
            .get(&attachment.storage_path)
            .await
            .map_err(|source| AttachmentError::StorageReadFailed {
                path: attachment.storage_path.clone(),
                source,
            })
    }

    pub fn url(&self, attachment: &attachments::Model) -> String {
        self.storage.url(&attachment.storage_path)
    }

    pub fn render(&self, attachment: &attachments::Model) -> AttachmentView {
        AttachmentView::from_model(attachment, self.url(attachment))
    }
}
