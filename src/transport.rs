//! The object-store transport collaborator, treated as a black box
//! providing listing and GET operations. `head_object`/`delete_object`
//! are deliberately absent — this tool never deletes or renames on its
//! own, it only emits scripts for the operator to run.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::CoreError;
use crate::types::ListedObject;

/// A streamed GET response: the declared content length plus a chunked body.
pub struct ObjectBody {
    pub size: u64,
    pub stream: BoxStream<'static, Result<Bytes, CoreError>>,
}

/// The transport operations the core depends on.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Paginated listing under `prefix`, one `Vec<ListedObject>` per page.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> BoxStream<'_, Result<Vec<ListedObject>, CoreError>>;

    /// Full-object GET, streamed.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectBody, CoreError>;

    /// Range GET used only by optional media-tag extraction.
    async fn get_object_range(
        &self,
        bucket: &str,
        key: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<u8>, CoreError>;
}

/// Connection details for an S3-or-compatible endpoint.
#[derive(Debug, Clone, Default)]
pub struct S3ClientConfig {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// The one real implementation of [`ObjectStoreClient`], over `aws-sdk-s3`.
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    pub async fn new(config: &S3ClientConfig) -> Self {
        let region = config.region.clone().unwrap_or_else(|| "us-east-1".to_string());
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region));

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            let creds = Credentials::new(key_id, secret, None, None, "bucketjanitor-config");
            loader = loader.credentials_provider(creds);
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
        }
    }
}

#[async_trait]
impl ObjectStoreClient for S3Client {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> BoxStream<'_, Result<Vec<ListedObject>, CoreError>> {
        let bucket = bucket.to_string();
        let prefix = prefix.to_string();
        let client = &self.client;

        Box::pin(stream::unfold(
            (None::<String>, false),
            move |(token, done)| {
                let bucket = bucket.clone();
                let prefix = prefix.clone();
                async move {
                    if done {
                        return None;
                    }

                    let mut req = client.list_objects_v2().bucket(&bucket).prefix(&prefix);
                    if let Some(t) = &token {
                        req = req.continuation_token(t);
                    }

                    let resp = match req.send().await {
                        Ok(resp) => resp,
                        Err(e) => return Some((Err(CoreError::Transport(e.to_string())), (None, true))),
                    };

                    let page: Vec<ListedObject> = resp
                        .contents()
                        .iter()
                        .filter_map(|obj| {
                            let key = obj.key()?.to_string();
                            let etag = obj.e_tag().unwrap_or_default().trim_matches('"').to_string();
                            let size = obj.size().unwrap_or(0).max(0) as u64;
                            let last_modified = obj
                                .last_modified()
                                .and_then(|d| DateTime::<Utc>::from_timestamp(d.secs(), 0))
                                .unwrap_or_else(Utc::now);
                            Some(ListedObject { key, size, etag, last_modified })
                        })
                        .collect();

                    let next_token = resp.next_continuation_token().map(|s| s.to_string());
                    let truncated = resp.is_truncated().unwrap_or(false) && next_token.is_some();

                    Some((Ok(page), (next_token, !truncated)))
                }
            },
        ))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectBody, CoreError> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| CoreError::Transport(e.to_string()))?;

        let size = resp.content_length().unwrap_or(0).max(0) as u64;
        let body = resp.body.map(|r| r.map_err(|e| CoreError::Transport(e.to_string())));

        Ok(ObjectBody { size, stream: Box::pin(body) })
    }

    async fn get_object_range(
        &self,
        bucket: &str,
        key: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<u8>, CoreError> {
        let range = format!("bytes={start}-{end}");
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .range(range)
            .send()
            .await
            .map_err(|e| CoreError::Transport(e.to_string()))?;

        let bytes = resp
            .body
            .collect()
            .await
            .map_err(|e| CoreError::Transport(e.to_string()))?;
        Ok(bytes.into_bytes().to_vec())
    }
}
