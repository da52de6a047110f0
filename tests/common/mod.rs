//! Shared test infrastructure: an in-memory `ObjectStoreClient` mock so
//! scanner/resolver integration tests never touch the network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bucketjanitor::error::CoreError;
use bucketjanitor::transport::{ObjectBody, ObjectStoreClient};
use bucketjanitor::types::ListedObject;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use futures::stream::{self, BoxStream};

/// A fixed bucket listing plus a key->bytes map for GETs, pageable by
/// `page_size`. Good enough to drive scanner/hasher integration tests
/// without a real object store.
pub struct MockObjectStoreClient {
    listing: Vec<ListedObject>,
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    page_size: usize,
}

impl MockObjectStoreClient {
    pub fn new(listing: Vec<ListedObject>) -> Self {
        Self { listing, bodies: Mutex::new(HashMap::new()), page_size: 1000 }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_body(self, key: &str, bytes: Vec<u8>) -> Self {
        self.bodies.lock().unwrap().insert(key.to_string(), bytes);
        self
    }
}

#[async_trait]
impl ObjectStoreClient for MockObjectStoreClient {
    async fn list_objects(
        &self,
        _bucket: &str,
        prefix: &str,
    ) -> BoxStream<'_, Result<Vec<ListedObject>, CoreError>> {
        let matching: Vec<ListedObject> =
            self.listing.iter().filter(|o| o.key.starts_with(prefix)).cloned().collect();
        let pages: Vec<Result<Vec<ListedObject>, CoreError>> =
            matching.chunks(self.page_size.max(1)).map(|chunk| Ok(chunk.to_vec())).collect();
        Box::pin(stream::iter(pages))
    }

    async fn get_object(&self, _bucket: &str, key: &str) -> Result<ObjectBody, CoreError> {
        let bodies = self.bodies.lock().unwrap();
        let bytes = bodies
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::Transport(format!("no such object: {key}")))?;
        let size = bytes.len() as u64;
        let chunk: Result<Bytes, CoreError> = Ok(Bytes::from(bytes));
        Ok(ObjectBody { size, stream: Box::pin(stream::iter(vec![chunk])) })
    }

    async fn get_object_range(
        &self,
        _bucket: &str,
        key: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<u8>, CoreError> {
        let bodies = self.bodies.lock().unwrap();
        let bytes = bodies
            .get(key)
            .cloned()
            .ok_or_else(|| CoreError::Transport(format!("no such object: {key}")))?;
        let start = start as usize;
        let end = (end as usize + 1).min(bytes.len());
        Ok(bytes.get(start..end).unwrap_or_default().to_vec())
    }
}

pub fn listed(key: &str, size: u64, etag: &str, days_ago: i64) -> ListedObject {
    ListedObject {
        key: key.to_string(),
        size,
        etag: etag.to_string(),
        last_modified: Utc.timestamp_opt(1_700_000_000 - days_ago * 86_400, 0).unwrap(),
    }
}
