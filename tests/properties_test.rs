//! Universal properties from the design doc, checked with `proptest`
//! instead of fixed examples (properties 1, 4, 5, 6, 7, 8).

mod common;

use bucketjanitor::hasher::hash_stream;
use bucketjanitor::normalize::{normalize, quality_score};
use bucketjanitor::rename::{plan_renames, CleanRule};
use bucketjanitor::retention::{select_keeper, Criterion};
use bucketjanitor::store::IndexStore;
use bucketjanitor::types::ObjectRecord;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use futures::stream;
use proptest::prelude::*;

fn arb_basename() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _.\\-]{1,24}"
}

fn record(key: &str, days_ago: i64) -> ObjectRecord {
    ObjectRecord {
        key: key.to_string(),
        size: 10,
        etag: "e".to_string(),
        is_multipart: false,
        sha256: None,
        last_modified: Utc.timestamp_opt(1_700_000_000 - days_ago * 86_400, 0).unwrap(),
        scanned_at: Utc::now(),
    }
}

proptest! {
    /// Property 1: upserting the same record twice leaves the index in
    /// the same state as upserting it once (keyed by object key).
    #[test]
    fn upsert_is_idempotent(key in arb_basename(), size in 0u64..1_000_000, etag in "[a-f0-9]{8,32}") {
        let store = IndexStore::open_in_memory().unwrap();
        let obj = record(&key, 0);
        let obj = ObjectRecord { size, etag: etag.clone(), ..obj };

        store.upsert_objects(&[obj.clone()]).unwrap();
        let once = store.get_stats().unwrap();
        store.upsert_objects(&[obj]).unwrap();
        let twice = store.get_stats().unwrap();

        prop_assert_eq!(once.total_objects, twice.total_objects);
        prop_assert_eq!(once.total_size, twice.total_size);
    }

    /// Property 4: hashing the same bytes, chunked any way, always
    /// yields the same digest.
    #[test]
    fn hash_stream_determinism(bytes in proptest::collection::vec(any::<u8>(), 0..2048), split_at in 0usize..2048) {
        let split_at = split_at.min(bytes.len());
        let (left, right) = bytes.split_at(split_at);

        let whole = stream::iter(vec![Ok::<Bytes, bucketjanitor::error::CoreError>(Bytes::copy_from_slice(&bytes))]);
        let split = stream::iter(vec![
            Ok::<Bytes, bucketjanitor::error::CoreError>(Bytes::copy_from_slice(left)),
            Ok::<Bytes, bucketjanitor::error::CoreError>(Bytes::copy_from_slice(right)),
        ]);

        let rt = tokio::runtime::Runtime::new().unwrap();
        let digest_whole = rt.block_on(hash_stream(whole)).unwrap();
        let digest_split = rt.block_on(hash_stream(split)).unwrap();

        prop_assert_eq!(digest_whole, digest_split);
    }

    /// Property 5: normalize is idempotent — re-normalizing its own
    /// output never changes it further.
    #[test]
    fn normalize_is_idempotent(key in arb_basename()) {
        let once = normalize(&key);
        let twice = normalize(&once);
        prop_assert_eq!(once, twice);
    }

    /// Property 6: normalizing a key never increases its quality score —
    /// stripping mess can only make a name look cleaner or leave it be.
    #[test]
    fn normalize_never_worsens_quality(key in arb_basename()) {
        let before = quality_score(&key);
        let after = quality_score(&normalize(&key));
        prop_assert!(after <= before);
    }

    /// Property 7: a rename plan is total (every renamed source appears
    /// exactly once) and assigns each source a unique target.
    #[test]
    fn rename_plan_totality(keys in proptest::collection::vec(arb_basename(), 1..12)) {
        let mut keys: Vec<String> = keys;
        keys.sort();
        keys.dedup();

        let plan = plan_renames(&[CleanRule::StripSpaces], &keys);

        let mut sources: Vec<&String> = plan.iter().map(|r| &r.source).collect();
        sources.sort();
        sources.dedup();
        prop_assert_eq!(sources.len(), plan.len(), "every source appears at most once");

        let mut targets: Vec<&String> = plan.iter().map(|r| &r.target).collect();
        targets.sort();
        targets.dedup();
        prop_assert_eq!(targets.len(), plan.len(), "every target is unique");
    }

    /// Property 8: retention selection is total over a non-empty group —
    /// exactly one keeper, and every other member appears as a deletion.
    #[test]
    fn retention_selection_totality(n in 1usize..8, days in proptest::collection::vec(0i64..30, 1..8)) {
        let days = &days[..days.len().min(n).max(1)];
        let objects: Vec<ObjectRecord> = days
            .iter()
            .enumerate()
            .map(|(i, d)| record(&format!("obj_{i}.bin"), *d))
            .collect();

        let (keeper, deletions) = select_keeper(&[Criterion::Oldest], &objects);
        prop_assert_eq!(deletions.len() + 1, objects.len());
        prop_assert!(!deletions.iter().any(|d| d.key == keeper.key));
    }
}
