//! Retention sweep behavior: depth, priority, dry runs, blob lifecycle.

mod common;

use uuid::Uuid;

use strata_core::traits::BlobStorage;
use strata_database::store::VersionStore;
use strata_entity::version::StorageType;

use common::{create_params, harness, settings_with_depth, settings_with_quota};

#[tokio::test]
async fn test_sweep_removes_oldest_versions_beyond_depth() {
    let h = harness();
    let file_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();
    h.store.save_settings(&settings_with_depth(owner_id, 3)).await.unwrap();

    for i in 0..5u8 {
        h.commit
            .create_version(create_params(file_id, owner_id, &vec![i; 100]))
            .await
            .unwrap();
    }
    assert_eq!(h.blobs.len().await, 5);

    let report = h.retention.run_cleanup(None, false).await.unwrap();

    assert_eq!(report.deleted_versions, 2);
    assert_eq!(report.freed_bytes, 200);
    assert_eq!(report.affected_users, 1);

    let remaining = h.store.find_versions(file_id).await.unwrap();
    assert_eq!(remaining.len(), 3);
    assert!(remaining.iter().all(|v| v.version_number >= 3));
    // Newest first, per the listing contract.
    assert_eq!(remaining[0].version_number, 5);
    // The swept versions' payloads were reclaimed.
    assert_eq!(h.blobs.len().await, 3);
    assert_eq!(h.store.usage(owner_id).await, 300);
}

#[tokio::test]
async fn test_high_priority_versions_survive_sweep() {
    let h = harness();
    let file_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();
    h.store.save_settings(&settings_with_depth(owner_id, 3)).await.unwrap();

    let mut first = create_params(file_id, owner_id, b"tagged release");
    first.is_high_priority = true;
    h.commit.create_version(first).await.unwrap();

    for i in 0..4u8 {
        h.commit
            .create_version(create_params(file_id, owner_id, &vec![i; 50]))
            .await
            .unwrap();
    }

    let report = h.retention.run_cleanup(Some(owner_id), false).await.unwrap();

    // Versions 1 and 2 are beyond depth 3, but version 1 is protected.
    assert_eq!(report.deleted_versions, 1);
    let remaining = h.store.all_versions().await;
    assert_eq!(remaining.len(), 4);
    assert!(remaining.iter().any(|v| v.version_number == 1));
    assert!(remaining.iter().all(|v| v.version_number != 2));
}

#[tokio::test]
async fn test_dry_run_previews_without_mutating() {
    let h = harness();
    let file_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();
    h.store.save_settings(&settings_with_depth(owner_id, 2)).await.unwrap();

    for i in 0..5u8 {
        h.commit
            .create_version(create_params(file_id, owner_id, &vec![i; 80]))
            .await
            .unwrap();
    }
    let usage_before = h.store.usage(owner_id).await;

    let preview = h.retention.run_cleanup(Some(owner_id), true).await.unwrap();

    assert_eq!(preview.deleted_versions, 3);
    assert_eq!(preview.freed_bytes, 240);
    assert_eq!(h.store.all_versions().await.len(), 5);
    assert_eq!(h.blobs.len().await, 5);
    assert_eq!(h.store.usage(owner_id).await, usage_before);

    // The real sweep then does exactly what the preview reported.
    let swept = h.retention.run_cleanup(Some(owner_id), false).await.unwrap();
    assert_eq!(swept.deleted_versions, preview.deleted_versions);
    assert_eq!(swept.freed_bytes, preview.freed_bytes);
}

#[tokio::test]
async fn test_shared_blob_survives_until_last_reference_drops() {
    let h = harness();
    let owner_id = Uuid::new_v4();
    let file_a = Uuid::new_v4();
    let file_b = Uuid::new_v4();
    h.store.save_settings(&settings_with_depth(owner_id, 1)).await.unwrap();

    let shared = b"content both files carry";

    // file A stores the payload; file B dedups against it.
    let stored = h
        .commit
        .create_version(create_params(file_a, owner_id, shared))
        .await
        .unwrap();
    let referenced = h
        .commit
        .create_version(create_params(file_b, owner_id, shared))
        .await
        .unwrap();
    assert_eq!(referenced.storage_type, StorageType::Reference);

    let checksum = stored.blob_checksum.clone();
    assert_eq!(h.store.blob(&checksum).await.unwrap().reference_count, 2);

    // Push file A's copy beyond depth and sweep: one reference drops, the
    // blob and its payload stay.
    h.commit
        .create_version(create_params(file_a, owner_id, b"file A moved on"))
        .await
        .unwrap();
    h.retention.run_cleanup(Some(owner_id), false).await.unwrap();

    assert!(h.store.find_version(stored.id).await.unwrap().is_none());
    let blob = h.store.blob(&checksum).await.unwrap();
    assert_eq!(blob.reference_count, 1);
    assert!(h.blobs.exists(&checksum).await.unwrap());

    // Push file B's copy out too: the last reference drops and the
    // payload is reclaimed.
    h.commit
        .create_version(create_params(file_b, owner_id, b"file B moved on"))
        .await
        .unwrap();
    h.retention.run_cleanup(Some(owner_id), false).await.unwrap();

    assert!(h.store.blob(&checksum).await.is_none());
    assert!(!h.blobs.exists(&checksum).await.unwrap());
}

#[tokio::test]
async fn test_cleanup_scoped_to_one_user() {
    let h = harness();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let alice_file = Uuid::new_v4();
    let bob_file = Uuid::new_v4();
    h.store.save_settings(&settings_with_depth(alice, 1)).await.unwrap();
    h.store.save_settings(&settings_with_depth(bob, 1)).await.unwrap();

    for i in 0..3u8 {
        h.commit
            .create_version(create_params(alice_file, alice, format!("alice {i}").as_bytes()))
            .await
            .unwrap();
        h.commit
            .create_version(create_params(bob_file, bob, format!("bob {i}").as_bytes()))
            .await
            .unwrap();
    }

    let report = h.retention.run_cleanup(Some(alice), false).await.unwrap();
    assert_eq!(report.deleted_versions, 2);
    assert_eq!(report.affected_users, 1);

    let remaining = h.store.all_versions().await;
    assert_eq!(remaining.iter().filter(|v| v.owner_id == alice).count(), 1);
    assert_eq!(remaining.iter().filter(|v| v.owner_id == bob).count(), 3);
}

#[tokio::test]
async fn test_cleanup_needed_threshold() {
    let h = harness();
    let owner_id = Uuid::new_v4();

    let below = settings_with_quota(owner_id, 1000, 850);
    assert!(!h.retention.cleanup_needed(&below));

    let at_headroom = settings_with_quota(owner_id, 1000, 900);
    assert!(h.retention.cleanup_needed(&at_headroom));
}
