//! The embedded index store: a single SQLite connection holding the
//! object inventory, derived media tags, and per-bucket config.
//!
//! Concurrency model: one writer. The CLI opens exactly one `IndexStore`
//! per invocation; nothing here is `Send`-shared across connections.

mod queries;
mod schema;

use rusqlite::Connection;
use std::path::Path;

use crate::error::Result;
use crate::types::{DuplicateGroup, IndexStats, MediaMetadata, ObjectRecord};

pub struct IndexStore {
    conn: Connection,
}

impl IndexStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn upsert_objects(&self, objects: &[ObjectRecord]) -> Result<u64> {
        queries::upsert_objects(&self.conn, objects)
    }

    pub fn delete_objects(&self, keys: &[String]) -> Result<u64> {
        queries::delete_objects(&self.conn, keys)
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        queries::keys_with_prefix(&self.conn, prefix)
    }

    pub fn etags_with_prefix(&self, prefix: &str) -> Result<std::collections::HashMap<String, String>> {
        queries::etags_with_prefix(&self.conn, prefix)
    }

    pub fn update_sha256(&self, key: &str, sha256: &str) -> Result<()> {
        queries::update_sha256(&self.conn, key, sha256)
    }

    pub fn find_size_duplicates(&self) -> Result<Vec<Vec<ObjectRecord>>> {
        queries::find_size_duplicates(&self.conn)
    }

    pub fn find_etag_duplicates(&self) -> Result<Vec<DuplicateGroup>> {
        queries::find_etag_duplicates(&self.conn)
    }

    pub fn find_multipart_candidates(&self) -> Result<Vec<Vec<ObjectRecord>>> {
        queries::find_multipart_candidates(&self.conn)
    }

    pub fn find_hash_duplicates(&self) -> Result<Vec<DuplicateGroup>> {
        queries::find_hash_duplicates(&self.conn)
    }

    pub fn get_all_duplicates(&self) -> Result<Vec<DuplicateGroup>> {
        queries::get_all_duplicates(&self.conn)
    }

    pub fn get_stats(&self) -> Result<IndexStats> {
        queries::get_stats(&self.conn)
    }

    pub fn all_objects(&self) -> Result<Vec<ObjectRecord>> {
        queries::all_objects(&self.conn)
    }

    pub fn all_media_metadata(&self) -> Result<Vec<MediaMetadata>> {
        queries::all_media_metadata(&self.conn)
    }

    pub fn upsert_bucket_config(&self, bucket: &str, endpoint_url: Option<&str>) -> Result<()> {
        queries::upsert_bucket_config(&self.conn, bucket, endpoint_url)
    }

    pub fn get_bucket_endpoint(&self, bucket: &str) -> Result<Option<String>> {
        queries::get_bucket_endpoint(&self.conn, bucket)
    }

    pub fn upsert_media_metadata(&self, meta: &MediaMetadata) -> Result<()> {
        queries::upsert_media_metadata(&self.conn, meta)
    }
}
