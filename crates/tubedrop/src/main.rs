use std::sync::Arc;

use tubedrop_core::{
    config::Config,
    pipeline::{Pipeline, PipelineOptions},
    staging::HttpStager,
};
use tubedrop_s3::{S3Config, S3ObjectStore};
use tubedrop_ytdlp::{YtDlpConfig, YtDlpExtractor};

#[tokio::main]
async fn main() -> Result<(), tubedrop_core::Error> {
    tubedrop_core::logging::init("tubedrop")?;

    let cfg = Arc::new(Config::load()?);

    let extractor = Arc::new(YtDlpExtractor::new(YtDlpConfig {
        program: cfg.ytdlp_path.clone(),
        format: cfg.ytdlp_format.clone(),
    }));
    let stager = Arc::new(HttpStager::new(
        cfg.staging_dir.clone(),
        cfg.download_timeout,
    )?);
    let store = Arc::new(
        S3ObjectStore::from_env(S3Config {
            bucket: cfg.s3_bucket.clone(),
            endpoint_url: cfg.s3_endpoint_url.clone(),
        })
        .await,
    );

    let pipeline = Arc::new(Pipeline::new(
        extractor,
        stager,
        store,
        PipelineOptions {
            key_prefix: cfg.s3_key_prefix.clone(),
            presign_expiry: cfg.presign_expiry,
        },
    ));

    tracing::info!(ytdlp = %cfg.ytdlp_path.display(), "collaborators ready");

    tubedrop_telegram::router::run_polling(cfg, pipeline)
        .await
        .map_err(|e| tubedrop_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
