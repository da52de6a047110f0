//! Orchestrates the three-pass duplicate resolver.
//!
//! Passes 1 and 2 are pure index queries; Pass 3 drives the stream
//! hasher for multipart members a size/ETag pass couldn't resolve.

use crate::error::Result;
use crate::hasher;
use crate::progress::ProgressSink;
use crate::store::IndexStore;
use crate::transport::ObjectStoreClient;
use crate::types::DuplicateGroup;

/// Outcome of a full resolver run: the final duplicate groups plus how
/// many objects Pass 3 hashed in this call (for the scan summary line).
pub struct ResolveOutcome {
    pub groups: Vec<DuplicateGroup>,
    pub hashed: u64,
}

/// Runs Pass 3 (size-class hashing for unresolved multipart members)
/// then returns the trusted-fingerprint duplicate groups.
pub async fn resolve_duplicates(
    client: &dyn ObjectStoreClient,
    store: &IndexStore,
    bucket: &str,
    progress: &dyn ProgressSink,
) -> Result<ResolveOutcome> {
    let hashed = hasher::hash_multipart_candidates(client, store, bucket, progress).await?;
    let groups = store.get_all_duplicates()?;
    Ok(ResolveOutcome { groups, hashed })
}
