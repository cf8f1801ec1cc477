use crate::entities::attachments;
use crate::error::AttachmentError;

/// One payload of a batch that could not be stored.
#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub name: String,
    pub error: AttachmentError,
}

/// Result of a best-effort batch: what was stored and what was not.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub attached: Vec<attachments::Model>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct PurgeReport {
    pub deleted: usize,
    /// Attachment id and the error that kept it from being deleted.
    pub failures: Vec<(String, AttachmentError)>,
}
