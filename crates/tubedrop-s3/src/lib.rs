//! S3 adapter (Object Store Uploader).
//!
//! Credentials and region come from the ambient AWS environment
//! (`aws-config` default provider chain).

use std::{path::Path, time::Duration};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    error::DisplayErrorContext, presigning::PresigningConfig, primitives::ByteStream, Client,
};

use tubedrop_core::{
    domain::{ObjectKey, RetrievalUrl},
    errors::Error,
    naming::{download_file_name, metadata_title},
    ports::ObjectStore,
    Result,
};

#[derive(Clone, Debug)]
pub struct S3Config {
    pub bucket: String,
    /// S3-compatible endpoint (MinIO, R2, ...). Implies path-style addressing.
    pub endpoint_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from the ambient AWS environment.
    pub async fn from_env(cfg: S3Config) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &cfg.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::with_client(Client::from_conf(builder.build()), cfg.bucket)
    }

    pub fn with_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn content_disposition(title: &str) -> String {
    format!("attachment; filename=\"{}\"", download_file_name(title))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, file: &Path, key: &ObjectKey, title: &str) -> Result<()> {
        let body = ByteStream::from_path(file)
            .await
            .map_err(|e| Error::External(format!("cannot read staged file: {e}")))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .body(body)
            .content_type("video/mp4")
            .content_disposition(content_disposition(title))
            .metadata("title", metadata_title(title))
            .send()
            .await
            .map_err(|e| {
                Error::External(format!("s3 upload failed: {}", DisplayErrorContext(&e)))
            })?;

        tracing::info!(bucket = %self.bucket, key = %key, "uploaded object");
        Ok(())
    }

    async fn presign_get(&self, key: &ObjectKey, expires_in: Duration) -> Result<RetrievalUrl> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| Error::External(format!("invalid presign expiry: {e}")))?;

        let req = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .presigned(presigning)
            .await
            .map_err(|e| {
                Error::External(format!("s3 presign failed: {}", DisplayErrorContext(&e)))
            })?;

        Ok(RetrievalUrl(req.uri().to_string()))
    }
}
