//! Local staging of downloaded streams.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{fs::File, io::AsyncWriteExt};

use crate::{
    domain::{ObjectKey, StreamDescriptor},
    errors::Error,
    ports::Stager,
    Result,
};

/// A local file that lives exactly as long as this guard.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed staged file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staged file")
            }
        }
    }
}

/// Streams a descriptor's direct URL into the staging directory.
#[derive(Clone, Debug)]
pub struct HttpStager {
    dir: PathBuf,
    http: reqwest::Client,
}

impl HttpStager {
    /// `timeout` of `None` leaves transfers unbounded.
    pub fn new(dir: impl Into<PathBuf>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;
        Ok(Self {
            dir: dir.into(),
            http,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn target_path(&self, key: &ObjectKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

#[async_trait]
impl Stager for HttpStager {
    async fn stage(&self, stream: &StreamDescriptor, key: &ObjectKey) -> Result<StagedFile> {
        let mut req = self.http.get(&stream.url);
        for (name, value) in &stream.http_headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let mut resp = req
            .send()
            .await
            .map_err(|e| Error::External(format!("download request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(Error::External(format!(
                "download failed: HTTP {}",
                resp.status()
            )));
        }

        let path = self.target_path(key);
        let mut file = File::create(&path).await?;
        // From here on the partial file is removed on every exit path.
        let staged = StagedFile::new(path);

        let mut written: u64 = 0;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| Error::External(format!("download interrupted: {e}")))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;

        tracing::debug!(
            path = %staged.path().display(),
            bytes = written,
            format = %stream.format_id,
            "staged stream"
        );
        Ok(staged)
    }
}
