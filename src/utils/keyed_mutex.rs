use crate::models::OwnerRef;
use crate::utils::naming::normalize_type;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-slot async lock for callers that want one writer per (owner, type).
///
/// The attachment service never takes these itself; hosts wrap their
/// `replace` calls when last-writer-wins is not acceptable.
#[derive(Debug, Clone, Default)]
pub struct SlotLock {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SlotLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot_key(owner: &OwnerRef, tag: Option<&str>) -> String {
        match normalize_type(tag) {
            Some(tag) => format!("{}:{}:{}", owner.kind, owner.id, tag),
            None => format!("{}:{}:", owner.kind, owner.id),
        }
    }

    /// Waits for the slot and holds it until the guard is dropped.
    pub async fn lock(&self, owner: &OwnerRef, tag: Option<&str>) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(Self::slot_key(owner, tag))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        mutex.lock_owned().await
    }

    /// Drops entries nobody is holding or waiting on.
    pub fn cleanup(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
