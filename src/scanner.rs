//! Incremental reconciliation scan.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use futures::StreamExt;

use crate::error::Result;
use crate::progress::ProgressSink;
use crate::store::IndexStore;
use crate::transport::ObjectStoreClient;
use crate::types::{ObjectRecord, ScanResult};

const FLUSH_BATCH_SIZE: usize = 1000;

/// Detects a multipart ETag: quoted hash followed by `-N`.
pub fn is_multipart_etag(etag: &str) -> bool {
    let clean = etag.trim_matches('"');
    match clean.rsplit_once('-') {
        Some((_, suffix)) => !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Scans `bucket`/`prefix`, reconciling the index against the live
/// listing. Returns counts of new, updated, and deleted records.
///
/// Deletion is scoped to `prefix`: only keys that would have appeared
/// in this listing are candidates for removal.
pub async fn scan_bucket(
    client: &dyn ObjectStoreClient,
    store: &IndexStore,
    bucket: &str,
    prefix: &str,
    cancel: &AtomicBool,
    progress: &dyn ProgressSink,
) -> Result<ScanResult> {
    let existing_etags: HashMap<String, String> = store.etags_with_prefix(prefix)?;
    let existing_keys: HashSet<String> = existing_etags.keys().cloned().collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut batch: Vec<ObjectRecord> = Vec::with_capacity(FLUSH_BATCH_SIZE);
    let mut new_count = 0u64;
    let mut updated_count = 0u64;

    progress.start(0, &format!("scanning s3://{bucket}/{prefix}"));

    let mut cancelled = false;
    let mut pages = client.list_objects(bucket, prefix).await;
    while let Some(page) = pages.next().await {
        if cancel.load(Ordering::Relaxed) {
            cancelled = true;
            break;
        }
        let page = page?;
        for listed in page {
            if listed.size == 0 {
                continue;
            }

            seen.insert(listed.key.clone());
            progress.set_current(&listed.key);

            let is_new = !existing_keys.contains(&listed.key);
            let etag_changed = existing_etags
                .get(&listed.key)
                .map(|etag| etag != &listed.etag)
                .unwrap_or(true);

            if is_new {
                new_count += 1;
            } else if !etag_changed {
                continue;
            } else {
                updated_count += 1;
            }

            batch.push(ObjectRecord {
                key: listed.key.clone(),
                size: listed.size,
                etag: listed.etag.clone(),
                is_multipart: is_multipart_etag(&listed.etag),
                sha256: None,
                last_modified: listed.last_modified,
                scanned_at: Utc::now(),
            });

            if batch.len() >= FLUSH_BATCH_SIZE {
                store.upsert_objects(&batch)?;
                progress.advance(batch.len() as u64);
                batch.clear();
            }
        }
    }

    if !batch.is_empty() {
        progress.advance(batch.len() as u64);
        store.upsert_objects(&batch)?;
    }

    // Deletion reconciliation requires a complete listing: on cancellation
    // `seen` only reflects the prefix scanned so far, and treating the rest
    // of `existing_keys` as vanished would reap rows the scan never looked
    // at. Skip it so a cancelled scan leaves the index consistent.
    let deleted_count = if cancelled {
        0
    } else {
        let deleted_keys: Vec<String> = existing_keys.difference(&seen).cloned().collect();
        if !deleted_keys.is_empty() {
            store.delete_objects(&deleted_keys)?;
        }
        deleted_keys.len() as u64
    };

    progress.finish();

    Ok(ScanResult {
        new: new_count,
        updated: updated_count,
        deleted: deleted_count,
    })
}
