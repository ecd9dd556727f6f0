//! Cloud object storage wrapper
//!
//! A thin list-by-prefix + upload capability over S3-compatible object
//! storage. Object keys mirror the compressed directory's relative paths
//! under a configured prefix. Credentials and region come from the ambient
//! AWS environment (env vars, profile, or instance role).

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::{debug, info};

/// Object storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Listing objects under the prefix failed
    #[error("failed to list bucket objects: {0}")]
    List(String),

    /// Uploading an object failed
    #[error("failed to upload {key}: {message}")]
    Upload {
        /// Destination object key
        key: String,
        /// Underlying SDK error
        message: String,
    },

    /// The local file could not be read for upload
    #[error("failed to read upload source: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to one bucket + key prefix.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl ObjectStore {
    /// Connect using the ambient AWS configuration.
    pub async fn from_env(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), bucket, prefix)
    }

    /// Wrap an existing SDK client.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self {
            client,
            bucket: bucket.into(),
            prefix,
        }
    }

    /// Bucket name this store writes to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// List every object key under the configured prefix, following
    /// continuation tokens across pages.
    ///
    /// Returned keys are relative to the prefix.
    pub async fn list_keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&self.prefix);
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::List(e.to_string()))?;

            for object in response.contents() {
                if let Some(key) = object.key() {
                    let relative = key.strip_prefix(&self.prefix).unwrap_or(key);
                    if !relative.is_empty() {
                        keys.push(relative.to_string());
                    }
                }
            }

            match response.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        debug!(
            bucket = %self.bucket,
            prefix = %self.prefix,
            objects = keys.len(),
            "Listed bucket objects"
        );
        Ok(keys)
    }

    /// Upload one local file under `relative_key`, placed below the
    /// configured prefix.
    pub async fn upload_file(&self, source: &Path, relative_key: &str) -> Result<(), StorageError> {
        let key = format!("{}{relative_key}", self.prefix);
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::Upload {
                key: key.clone(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.clone(),
                message: e.to_string(),
            })?;

        info!(bucket = %self.bucket, key = %key, "Uploaded object");
        Ok(())
    }
}
