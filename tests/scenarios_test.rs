//! Concrete scenarios S1-S7 from the design doc, run end to end against
//! an in-memory index and a mock object-store client.

mod common;

use std::sync::atomic::AtomicBool;

use bucketjanitor::fingerprint;
use bucketjanitor::progress::NullProgress;
use bucketjanitor::rename::{self, CleanRule};
use bucketjanitor::retention::{select_keeper, Criterion};
use bucketjanitor::scanner::scan_bucket;
use bucketjanitor::store::IndexStore;
use bucketjanitor::types::ObjectRecord;
use chrono::{TimeZone, Utc};
use common::{listed, MockObjectStoreClient};

fn record(key: &str, size: u64, etag: &str, multipart: bool, sha256: Option<&str>, days_ago: i64) -> ObjectRecord {
    ObjectRecord {
        key: key.to_string(),
        size,
        etag: etag.to_string(),
        is_multipart: multipart,
        sha256: sha256.map(str::to_string),
        last_modified: Utc.timestamp_opt(1_700_000_000 - days_ago * 86_400, 0).unwrap(),
        scanned_at: Utc::now(),
    }
}

/// S1. ETag-only duplicate, single-part.
#[test]
fn s1_etag_only_duplicate() {
    let store = IndexStore::open_in_memory().unwrap();
    store
        .upsert_objects(&[
            record("a.mp3", 100, "e1", false, None, 0),
            record("b.mp3", 100, "e1", false, None, 0),
            record("c.mp3", 300, "e2", false, None, 0),
        ])
        .unwrap();

    let stats = store.get_stats().unwrap();
    assert_eq!(stats.total_objects, 3);
    assert_eq!(stats.duplicate_groups, 1);
    assert_eq!(stats.duplicate_objects, 1);
    assert_eq!(stats.wasted_bytes, 100);
}

/// S2. Multipart collision resolved via SHA-256.
#[tokio::test]
async fn s2_multipart_collision_resolved_via_sha256() {
    let store = IndexStore::open_in_memory().unwrap();
    store
        .upsert_objects(&[
            record("x.bin", 200, "aaa-2", true, None, 0),
            record("y.bin", 200, "bbb-3", true, None, 0),
        ])
        .unwrap();

    let body = vec![7u8; 200];
    let client = MockObjectStoreClient::new(vec![])
        .with_body("x.bin", body.clone())
        .with_body("y.bin", body);

    let outcome =
        fingerprint::resolve_duplicates(&client, &store, "bucket", &NullProgress).await.unwrap();
    assert_eq!(outcome.hashed, 2);

    let stats = store.get_stats().unwrap();
    assert_eq!(stats.duplicate_groups, 1);
    assert_eq!(stats.wasted_bytes, 200);
}

/// S3. Mixed multipart + single-part, same bytes: one group, not two.
#[tokio::test]
async fn s3_mixed_multipart_and_single_part_same_bytes() {
    let store = IndexStore::open_in_memory().unwrap();
    store
        .upsert_objects(&[
            record("a", 100, "e1", false, None, 0),
            record("b", 100, "e1", true, None, 0),
        ])
        .unwrap();

    // Pass 2 must exclude this group (it contains a multipart member).
    assert!(store.get_all_duplicates().unwrap().is_empty());

    let body = vec![9u8; 100];
    let client = MockObjectStoreClient::new(vec![]).with_body("a", body.clone()).with_body("b", body);
    fingerprint::resolve_duplicates(&client, &store, "bucket", &NullProgress).await.unwrap();

    let stats = store.get_stats().unwrap();
    assert_eq!(stats.duplicate_groups, 1, "must not double-count across etag and hash passes");
}

/// S4. Incremental scan: one modified, one new, none deleted.
#[tokio::test]
async fn s4_incremental_scan_detects_new_and_updated() {
    let store = IndexStore::open_in_memory().unwrap();
    store.upsert_objects(&[record("a.mp3", 10, "e1", false, None, 5)]).unwrap();

    let client = MockObjectStoreClient::new(vec![
        listed("a.mp3", 10, "e2", 0),
        listed("c.mp3", 20, "e3", 0),
    ]);
    let cancel = AtomicBool::new(false);
    let result =
        scan_bucket(&client, &store, "bucket", "", &cancel, &NullProgress).await.unwrap();

    assert_eq!(result.new, 1);
    assert_eq!(result.updated, 1);
    assert_eq!(result.deleted, 0);
}

/// S5. Deletion reconciliation cascades media metadata.
#[tokio::test]
async fn s5_deletion_reconciliation_cascades_media() {
    let store = IndexStore::open_in_memory().unwrap();
    store
        .upsert_objects(&[
            record("a", 1, "ea", false, None, 0),
            record("b", 1, "eb", false, None, 0),
            record("c", 1, "ec", false, None, 0),
        ])
        .unwrap();
    store
        .upsert_media_metadata(&bucketjanitor::types::MediaMetadata {
            key: "b".to_string(),
            artist: Some("Artist".to_string()),
            ..Default::default()
        })
        .unwrap();

    let client = MockObjectStoreClient::new(vec![listed("a", 1, "ea", 0), listed("c", 1, "ec", 0)]);
    let cancel = AtomicBool::new(false);
    let result = scan_bucket(&client, &store, "bucket", "", &cancel, &NullProgress).await.unwrap();

    assert_eq!(result.deleted, 1);
    let remaining: Vec<String> = store.all_objects().unwrap().into_iter().map(|o| o.key).collect();
    assert_eq!(remaining, vec!["a".to_string(), "c".to_string()]);
    assert!(store.all_media_metadata().unwrap().is_empty(), "media metadata must cascade on delete");
}

/// S6. Rename planning with a collision against an existing key.
#[test]
fn s6_rename_planning_with_collision() {
    let keys = vec![" photo.jpg".to_string(), "photo.jpg".to_string()];
    let plan = rename::plan_renames(&[CleanRule::StripSpaces], &keys);

    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].source, " photo.jpg");
    assert_eq!(plan[0].target, "photo_2.jpg");
    assert_eq!(plan[0].conflict_with, Some("photo.jpg".to_string()));
}

/// S7. Multi-criterion retention: shortest then oldest picks the plain name.
#[test]
fn s7_multi_criterion_retention() {
    let objects = vec![
        record("Photo/image.jpg", 10, "e", false, None, 2),
        record("Photo/image_1.jpg", 10, "e", false, None, 1),
        record("Photo/image_2.jpg", 10, "e", false, None, 0),
    ];
    let (keeper, deletions) =
        select_keeper(&[Criterion::Shortest, Criterion::Oldest], &objects);

    assert_eq!(keeper.key, "Photo/image.jpg");
    assert_eq!(deletions.len(), 2);
}
