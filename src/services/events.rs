use crate::entities::attachments;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// Emitted after a mutation has been fully applied to storage and records.
#[derive(Debug, Clone)]
pub enum AttachmentEvent {
    Stored(attachments::Model),
    Replaced {
        attachment: attachments::Model,
        previous_path: String,
    },
    Deleted(attachments::Model),
}

impl AttachmentEvent {
    pub fn attachment(&self) -> &attachments::Model {
        match self {
            AttachmentEvent::Stored(a) | AttachmentEvent::Deleted(a) => a,
            AttachmentEvent::Replaced { attachment, .. } => attachment,
        }
    }

    /// Storage path the event concerns; for a replace this is the new path.
    pub fn storage_path(&self) -> &str {
        &self.attachment().storage_path
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AttachmentEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AttachmentEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: AttachmentEvent) {
        // No subscribers is the common case.
        if self.sender.send(event).is_err() {
            tracing::trace!("attachment event dropped: no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
