mod common;

use chrono::{Duration, Utc};
use common::{FlakyStorage, jpeg, setup_records, text};
use rust_attachments::config::{AppConfig, AttachmentConfig};
use rust_attachments::infrastructure::storage::setup_storage;
use rust_attachments::models::{Owner, OwnerRef, TypeFilter, UploadPayload};
use rust_attachments::services::attachment_service::AttachmentService;
use rust_attachments::services::memory_storage::MemoryStorageService;
use rust_attachments::services::owner_lifecycle::{OwnerLifecycle, PendingUploads, RemovalKind};
use rust_attachments::services::storage::StorageService;
use rust_attachments::services::worker::OrphanSweeper;
use rust_attachments::utils::keyed_mutex::SlotLock;
use rust_attachments::AppState;
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// A host model that owns attachments.
struct Invoice {
    number: u64,
}

impl Owner for Invoice {
    fn owner_kind(&self) -> &str {
        "billing::Invoice"
    }

    fn owner_key(&self) -> String {
        self.number.to_string()
    }
}

#[tokio::test]
async fn test_soft_removal_keeps_then_permanent_removal_cascades() {
    let records = setup_records().await;
    let storage = Arc::new(MemoryStorageService::new());
    let service = AttachmentService::new(records, storage.clone());
    let invoice = Invoice { number: 42 };
    let owner = invoice.owner_ref();

    let scan = service
        .attach(&invoice, jpeg("scan.jpg"), Some("scan"))
        .await
        .unwrap();
    service
        .attach(&invoice, text("notes.txt", "paid"), None)
        .await
        .unwrap();
    assert!(scan.storage_path.starts_with("invoice/"));

    let report = service
        .owner_removed(&owner, RemovalKind::Soft)
        .await
        .unwrap();
    assert_eq!(report.deleted, 0);

    let kept = service.list_for(&invoice, TypeFilter::Any).await.unwrap();
    assert_eq!(kept.len(), 2);
    for attachment in &kept {
        assert!(storage.exists(&attachment.storage_path).await.unwrap());
    }

    let report = service
        .owner_removed(&owner, RemovalKind::Permanent)
        .await
        .unwrap();
    assert_eq!(report.deleted, 2);
    assert!(service.list_for(&invoice, TypeFilter::Any).await.unwrap().is_empty());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_owner_saved_applies_pending_uploads() {
    let records = setup_records().await;
    let storage = Arc::new(MemoryStorageService::new());
    let service = AttachmentService::new(records, storage.clone());
    let user = OwnerRef::new("User", 5);

    let first = service
        .owner_saved(
            &user,
            PendingUploads::new()
                .single(jpeg("avatar.jpg"))
                .slot("Cover Photo", jpeg("cover.jpg"))
                .many(vec![jpeg("one.jpg"), UploadPayload::malformed("bad.jpg")]),
        )
        .await;

    assert_eq!(first.stored.len(), 3);
    assert_eq!(first.failures.len(), 1);
    assert_eq!(first.failures[0].index, 3);

    let cover = service
        .current(&user, Some("cover_photo"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cover.original_name, "cover.jpg");

    // Saving again reassigns the slot instead of stacking a second record.
    let second = service
        .owner_saved(
            &user,
            PendingUploads::new().slot("cover photo", jpeg("cover-v2.jpg")),
        )
        .await;
    assert!(second.failures.is_empty());

    let covers = service
        .list_for(&user, TypeFilter::of(Some("cover_photo")))
        .await
        .unwrap();
    assert_eq!(covers.len(), 1);
    assert_eq!(covers[0].id, cover.id);
    assert_eq!(covers[0].original_name, "cover-v2.jpg");
    assert!(!storage.exists(&cover.storage_path).await.unwrap());

    // The untyped single slot is reassigned the same way: its newest entry
    // is repointed and the untyped count does not grow.
    let newest = service.current(&user, None).await.unwrap().unwrap();
    let third = service
        .owner_saved(&user, PendingUploads::new().single(jpeg("avatar-v2.jpg")))
        .await;
    assert!(third.failures.is_empty());
    assert_eq!(third.stored[0].id, newest.id);
    assert!(!storage.exists(&newest.storage_path).await.unwrap());
    assert_eq!(
        service.list_for(&user, TypeFilter::Untyped).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_slot_lock_serializes_replacements() {
    let records = setup_records().await;
    let storage = Arc::new(MemoryStorageService::new());
    let service = Arc::new(AttachmentService::new(records, storage.clone()));
    let locks = SlotLock::new();
    let user = OwnerRef::new("User", 1);

    let mut handles = Vec::new();
    for i in 0..4 {
        let service = service.clone();
        let locks = locks.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            let _guard = locks.lock(&user, Some("photo")).await;
            service
                .replace(&user, Some("photo"), jpeg(&format!("photo-{}.jpg", i)))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let photos = service
        .list_for(&user, TypeFilter::of(Some("photo")))
        .await
        .unwrap();
    assert_eq!(photos.len(), 1);
    assert_eq!(storage.len(), 1);
    assert!(storage.exists(&photos[0].storage_path).await.unwrap());
}

#[tokio::test]
async fn test_sweep_reclaims_orphans_left_by_failed_deletes() {
    let records = setup_records().await;
    let storage = Arc::new(FlakyStorage::new());
    let service = AttachmentService::new(records.clone(), storage.clone());
    let user = OwnerRef::new("User", 1);

    let live = service.attach(&user, jpeg("live.jpg"), None).await.unwrap();
    let doomed = service.attach(&user, jpeg("doomed.jpg"), None).await.unwrap();

    storage.fail_delete.store(true, Ordering::SeqCst);
    assert!(service.delete(&doomed).await.unwrap());
    storage.fail_delete.store(false, Ordering::SeqCst);
    assert!(storage.exists(&doomed.storage_path).await.unwrap());

    storage
        .put("tmp/scratch.bin", bytes::Bytes::from_static(b"x"), "application/octet-stream")
        .await
        .unwrap();
    let aged = Utc::now() - Duration::hours(2);
    storage.inner.touch(&doomed.storage_path, aged);
    storage.inner.touch(&live.storage_path, aged);
    storage.inner.touch("tmp/scratch.bin", aged);

    let sweeper = OrphanSweeper::new(records, storage.clone(), 1);
    let report = sweeper.sweep("").await.unwrap();

    assert_eq!(report.removed, vec![doomed.storage_path.clone()]);
    assert_eq!(report.skipped_foreign, 1);
    assert!(storage.exists(&live.storage_path).await.unwrap());
    assert!(storage.exists("tmp/scratch.bin").await.unwrap());
}

#[tokio::test]
async fn test_app_state_wires_configured_disk() {
    let config = AppConfig::development();
    let state = AppState::build(config).await.unwrap();

    let user = OwnerRef::new("User", 1);
    let stored = state
        .attachments
        .attach(&user, jpeg("a.jpg"), None)
        .await
        .unwrap();
    assert!(state.attachments.url(&stored).starts_with("memory://"));

    let report = state.sweeper().sweep("").await.unwrap();
    assert!(report.removed.is_empty());
}

#[tokio::test]
async fn test_unknown_disk_is_rejected() {
    let records = setup_records().await;
    let registry = setup_storage(&AppConfig::development()).await;
    let config = AttachmentConfig {
        storage_disk: "nowhere".to_string(),
    };

    let err = AttachmentService::from_registry(records, &registry, &config)
        .err()
        .unwrap();
    assert_eq!(err.code(), "STORAGE_NOT_CONFIGURED");
}
