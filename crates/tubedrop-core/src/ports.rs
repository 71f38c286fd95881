//! Ports for the external collaborators of the link pipeline.

use std::{path::Path, time::Duration};

use async_trait::async_trait;

use crate::{
    domain::{ObjectKey, ResolvedVideo, RetrievalUrl, StreamDescriptor, VideoLink},
    staging::StagedFile,
    Result,
};

/// Resolves a video-sharing link into metadata plus one selected stream.
#[async_trait]
pub trait LinkExtractor: Send + Sync {
    async fn resolve(&self, link: &VideoLink) -> Result<ResolvedVideo>;
}

/// Materializes a stream as a local file named after `key`.
///
/// Returns only once the whole transfer completed. The returned guard removes
/// the file when dropped.
#[async_trait]
pub trait Stager: Send + Sync {
    async fn stage(&self, stream: &StreamDescriptor, key: &ObjectKey) -> Result<StagedFile>;
}

/// Object storage with pre-signed retrieval.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `file` under `key`. `title` is kept as object metadata.
    async fn upload(&self, file: &Path, key: &ObjectKey, title: &str) -> Result<()>;

    async fn presign_get(&self, key: &ObjectKey, expires_in: Duration) -> Result<RetrievalUrl>;
}
