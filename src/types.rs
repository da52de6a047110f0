//! Core data model: object records, bucket config, media metadata,
//! duplicate groups, scan results, and rename plans.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One indexed remote object, keyed by its S3 key.
///
/// Invariant: if `is_multipart` is true, `etag` matches `<hex>-<N>`
/// with `N` a positive integer, and `sha256` is the only trustworthy
/// cross-store fingerprint for this record.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub is_multipart: bool,
    pub sha256: Option<String>,
    pub last_modified: DateTime<Utc>,
    pub scanned_at: DateTime<Utc>,
}

/// Per-bucket config captured during a scan, recovered later by script emission.
#[derive(Debug, Clone)]
pub struct BucketConfig {
    pub bucket: String,
    pub endpoint_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Media tags extracted from a prefix of an object's bytes. Lifecycle is
/// tied to the object record: deleting the object cascades here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MediaMetadata {
    pub key: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub duration_s: Option<f64>,
    pub codec: Option<String>,
    pub bitrate: Option<u32>,
}

/// A derived, non-persisted group of object records sharing a trusted
/// fingerprint (a single-part ETag or a SHA-256 digest).
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub fingerprint: String,
    pub size: u64,
    pub objects: Vec<ObjectRecord>,
}

impl DuplicateGroup {
    /// Bytes reclaimable by keeping exactly one copy: `size * (n - 1)`.
    pub fn wasted_bytes(&self) -> u64 {
        self.size * (self.objects.len() as u64 - 1)
    }
}

/// Counters returned by a reconciliation scan.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanResult {
    pub new: u64,
    pub updated: u64,
    pub deleted: u64,
}

/// Aggregate index statistics.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IndexStats {
    pub total_objects: u64,
    pub total_size: u64,
    pub duplicate_groups: u64,
    pub duplicate_objects: u64,
    pub wasted_bytes: u64,
}

/// A conflict-resolved rename: every source key maps to exactly one target,
/// and the plan records whether that target differed from the rule's
/// original (unresolved) output.
#[derive(Debug, Clone)]
pub struct PlannedRename {
    pub source: String,
    pub target: String,
    /// `Some(original_target)` when conflict resolution changed the target.
    pub conflict_with: Option<String>,
}

/// Minimum detail the scanner needs per listed entry, independent of how
/// the transport collaborator represents it on the wire.
#[derive(Debug, Clone)]
pub struct ListedObject {
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}
