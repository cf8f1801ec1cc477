use crate::entities::attachments;
use crate::error::Result;
use crate::models::{OwnerRef, UploadPayload};
use crate::services::attachment_service::{AttachmentService, BatchFailure, PurgeReport};
use crate::utils::naming::normalize_type;
use async_trait::async_trait;

/// How an owner left the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalKind {
    /// Logically removed but retained; attachments stay.
    Soft,
    /// Gone for good; attachments are cascaded.
    Permanent,
}

#[derive(Debug, Clone)]
enum Assignment {
    /// Single-slot assignment, resolved with `replace`.
    Slot {
        tag: Option<String>,
        payload: UploadPayload,
    },
    /// Additional attachments, resolved with `attach_many`.
    Many {
        tag: Option<String>,
        payloads: Vec<UploadPayload>,
    },
}

/// Uploads collected while an owner is being created or edited, applied once
/// the owner's own write has committed.
#[derive(Debug, Clone, Default)]
pub struct PendingUploads {
    assignments: Vec<Assignment>,
}

impl PendingUploads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the owner's untyped single attachment.
    pub fn single(self, payload: UploadPayload) -> Self {
        self.push(Assignment::Slot { tag: None, payload })
    }

    /// Sets the attachment in the `tag` slot.
    pub fn slot(self, tag: &str, payload: UploadPayload) -> Self {
        self.push(Assignment::Slot {
            tag: normalize_type(Some(tag)),
            payload,
        })
    }

    /// Adds untyped attachments.
    pub fn many(self, payloads: Vec<UploadPayload>) -> Self {
        self.push(Assignment::Many {
            tag: None,
            payloads,
        })
    }

    /// Adds attachments tagged `tag`.
    pub fn many_as(self, tag: &str, payloads: Vec<UploadPayload>) -> Self {
        self.push(Assignment::Many {
            tag: normalize_type(Some(tag)),
            payloads,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assignments
            .iter()
            .map(|a| match a {
                Assignment::Slot { .. } => 1,
                Assignment::Many { payloads, .. } => payloads.len(),
            })
            .sum()
    }

    fn push(mut self, assignment: Assignment) -> Self {
        self.assignments.push(assignment);
        self
    }
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub stored: Vec<attachments::Model>,
    pub failures: Vec<BatchFailure>,
}

/// Hooks the owner's persistence layer calls at its commit points.
#[async_trait]
pub trait OwnerLifecycle: Send + Sync {
    /// After the owner was created or updated.
    async fn owner_saved(&self, owner: &OwnerRef, pending: PendingUploads) -> ApplyReport;

    /// After the owner was removed; only permanent removal cascades.
    async fn owner_removed(&self, owner: &OwnerRef, removal: RemovalKind) -> Result<PurgeReport>;
}

#[async_trait]
impl OwnerLifecycle for AttachmentService {
    async fn owner_saved(&self, owner: &OwnerRef, pending: PendingUploads) -> ApplyReport {
        let mut report = ApplyReport::default();
        let mut index = 0;

        for assignment in pending.assignments {
            match assignment {
                Assignment::Slot { tag, payload } => {
                    let name = payload.original_name.clone();
                    match self.replace(owner, tag.as_deref(), payload).await {
                        Ok(model) => report.stored.push(model),
                        Err(error) => {
                            tracing::warn!("Slot upload '{}' for {} failed: {}", name, owner, error);
                            report.failures.push(BatchFailure { index, name, error });
                        }
                    }
                    index += 1;
                }
                Assignment::Many { tag, payloads } => {
                    let count = payloads.len();
                    let outcome = self.attach_many(owner, payloads, tag.as_deref()).await;
                    report.stored.extend(outcome.attached);
                    report
                        .failures
                        .extend(outcome.failures.into_iter().map(|f| BatchFailure {
                            index: index + f.index,
                            ..f
                        }));
                    index += count;
                }
            }
        }

        report
    }

    async fn owner_removed(&self, owner: &OwnerRef, removal: RemovalKind) -> Result<PurgeReport> {
        match removal {
            RemovalKind::Soft => {
                tracing::info!("{} soft-removed; attachments retained", owner);
                Ok(PurgeReport::default())
            }
            RemovalKind::Permanent => self.delete_all_for(owner).await,
        }
    }
}
