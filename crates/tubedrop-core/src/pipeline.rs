//! The link pipeline: extract, stage, upload, pre-sign.

use std::{future::Future, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    domain::{Delivery, VideoLink},
    errors::{Error, PipelineError},
    naming,
    ports::{LinkExtractor, ObjectStore, Stager},
    Result,
};

#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub key_prefix: String,
    pub presign_expiry: Duration,
}

pub struct Pipeline {
    extractor: Arc<dyn LinkExtractor>,
    stager: Arc<dyn Stager>,
    store: Arc<dyn ObjectStore>,
    opts: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn LinkExtractor>,
        stager: Arc<dyn Stager>,
        store: Arc<dyn ObjectStore>,
        opts: PipelineOptions,
    ) -> Self {
        Self {
            extractor,
            stager,
            store,
            opts,
        }
    }

    /// Run one link through every stage.
    ///
    /// The staged file is gone by the time this returns, whatever the outcome.
    pub async fn run(
        &self,
        link: &VideoLink,
        cancel: &CancellationToken,
    ) -> std::result::Result<Delivery, PipelineError> {
        let resolved = step(
            cancel,
            PipelineError::Extraction,
            self.extractor.resolve(link),
        )
        .await?;

        let key = naming::object_key(
            &self.opts.key_prefix,
            link,
            &resolved.metadata,
            naming::time_nonce(),
        );
        tracing::info!(
            title = %resolved.metadata.title,
            format = %resolved.stream.format_id,
            height = ?resolved.stream.height,
            key = %key,
            "resolved link"
        );

        let staged = step(
            cancel,
            PipelineError::Staging,
            self.stager.stage(&resolved.stream, &key),
        )
        .await?;

        step(
            cancel,
            PipelineError::Upload,
            self.store
                .upload(staged.path(), &key, &resolved.metadata.title),
        )
        .await?;
        drop(staged);

        let url = step(
            cancel,
            PipelineError::Upload,
            self.store.presign_get(&key, self.opts.presign_expiry),
        )
        .await?;

        Ok(Delivery {
            metadata: resolved.metadata,
            key,
            url,
        })
    }
}

async fn step<T>(
    cancel: &CancellationToken,
    tag: fn(Error) -> PipelineError,
    fut: impl Future<Output = Result<T>>,
) -> std::result::Result<T, PipelineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        res = fut => res.map_err(tag),
    }
}
