//! Constant-memory SHA-256 streaming and the Pass-3 hashing driver.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::progress::ProgressSink;
use crate::store::IndexStore;
use crate::transport::ObjectStoreClient;

/// Constant-memory read size; the hasher never buffers more than one
/// chunk at a time regardless of object size.
pub const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// Feeds an arbitrary byte stream into SHA-256 and returns the lowercase
/// hex digest. No bytes are retained beyond the rolling hasher state,
/// so memory use is independent of the stream's total length.
pub async fn hash_stream<S>(mut stream: S) -> Result<String>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let mut hasher = Sha256::new();
    while let Some(chunk) = stream.next().await {
        hasher.update(&chunk?);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Requests a full-object GET and streams the body through [`hash_stream`].
pub async fn hash_object(
    client: &dyn ObjectStoreClient,
    bucket: &str,
    key: &str,
) -> Result<String> {
    let body = client.get_object(bucket, key).await?;
    hash_stream(body.stream).await
}

/// Drives Pass 3: hashes every object in an un-hashed multipart size
/// class and persists the digest. Resumable — objects whose `sha256`
/// is already set were excluded from the candidate query.
pub async fn hash_multipart_candidates(
    client: &dyn ObjectStoreClient,
    store: &IndexStore,
    bucket: &str,
    progress: &dyn ProgressSink,
) -> Result<u64> {
    let groups = store.find_multipart_candidates()?;
    let all_objects: Vec<_> = groups.into_iter().flatten().collect();

    if all_objects.is_empty() {
        return Ok(0);
    }

    progress.start(all_objects.len() as u64, "hashing");
    let mut hashed = 0u64;
    for obj in &all_objects {
        progress.set_current(&obj.key);
        let digest = hash_object(client, bucket, &obj.key).await?;
        store.update_sha256(&obj.key, &digest)?;
        hashed += 1;
        progress.advance(1);
    }
    progress.finish();

    Ok(hashed)
}
