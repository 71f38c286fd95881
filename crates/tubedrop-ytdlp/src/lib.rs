//! yt-dlp adapter (Link Extractor).
//!
//! Resolves a link with `yt-dlp --dump-single-json` and selects one
//! progressive rendition the stager can fetch directly.

use std::{collections::BTreeMap, path::PathBuf, process::Stdio};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use tubedrop_core::{
    domain::{ResolvedVideo, StreamDescriptor, VideoLink, VideoMetadata},
    errors::Error,
    ports::LinkExtractor,
    Result,
};

const STDERR_TAIL_MAX_LINES: usize = 5;

#[derive(Clone, Debug)]
pub struct YtDlpConfig {
    pub program: PathBuf,
    /// yt-dlp `-f` selector.
    pub format: String,
}

/// A concrete `yt-dlp` invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct YtDlpExtractor {
    cfg: YtDlpConfig,
}

impl YtDlpExtractor {
    pub fn new(cfg: YtDlpConfig) -> Self {
        Self { cfg }
    }

    pub fn build_invocation(&self, link: &VideoLink) -> CliInvocation {
        let args = vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "-f".to_string(),
            self.cfg.format.clone(),
            // Everything after `--` is a URL, even if it starts with `-`.
            "--".to_string(),
            link.as_str().to_string(),
        ];
        CliInvocation {
            program: self.cfg.program.clone(),
            args,
        }
    }
}

#[async_trait]
impl LinkExtractor for YtDlpExtractor {
    async fn resolve(&self, link: &VideoLink) -> Result<ResolvedVideo> {
        if link.as_str().is_empty() {
            return Err(Error::External("empty link".to_string()));
        }

        let inv = self.build_invocation(link);
        tracing::debug!(program = %inv.program.display(), link = %link, "running yt-dlp");

        // Dropping the future (job cancelled) kills the child.
        let output = Command::new(&inv.program)
            .args(&inv.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::External(format!(
                    "failed to run {}: {e}",
                    inv.program.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = error_summary(&stderr);
            if tail.is_empty() {
                return Err(Error::External(format!(
                    "yt-dlp exited with status {}",
                    output.status
                )));
            }
            return Err(Error::External(tail));
        }

        parse_info(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct InfoJson {
    #[serde(rename = "_type")]
    kind: Option<String>,
    id: Option<String>,
    title: Option<String>,
    view_count: Option<u64>,
    #[serde(default)]
    requested_downloads: Vec<FormatJson>,
}

#[derive(Debug, Default, Deserialize)]
struct FormatJson {
    format_id: Option<String>,
    ext: Option<String>,
    height: Option<u32>,
    url: Option<String>,
    #[serde(default)]
    http_headers: BTreeMap<String, String>,
    filesize: Option<u64>,
}

/// Parse `--dump-single-json` output into metadata plus the selected stream.
pub fn parse_info(stdout: &[u8]) -> Result<ResolvedVideo> {
    let value: serde_json::Value = serde_json::from_slice(stdout)?;
    let info: InfoJson = serde_json::from_value(value.clone())?;

    if info.kind.as_deref() == Some("playlist") {
        return Err(Error::External(
            "playlists are not supported; send a link to a single video".to_string(),
        ));
    }

    let id = info
        .id
        .ok_or_else(|| Error::External("yt-dlp output has no video id".to_string()))?;

    // Single-format selections are mirrored at the top level; prefer the
    // explicit download entry when present.
    let format = match info.requested_downloads.into_iter().next() {
        Some(f) => f,
        None => serde_json::from_value::<FormatJson>(value)?,
    };

    let url = format.url.filter(|u| !u.is_empty()).ok_or_else(|| {
        Error::External(
            "selected format has no direct URL (merged formats are not supported)".to_string(),
        )
    })?;

    let title = info
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| id.clone());

    Ok(ResolvedVideo {
        metadata: VideoMetadata {
            id,
            title,
            view_count: info.view_count,
        },
        stream: StreamDescriptor {
            format_id: format.format_id.unwrap_or_else(|| "unknown".to_string()),
            ext: format.ext.unwrap_or_else(|| "mp4".to_string()),
            height: format.height,
            url,
            http_headers: format.http_headers,
            filesize: format.filesize,
        },
    })
}

/// The `ERROR:` lines of yt-dlp's stderr, else its last few lines.
fn error_summary(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let errors: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| l.starts_with("ERROR:"))
        .collect();
    if !errors.is_empty() {
        return errors.join("\n");
    }

    let start = lines.len().saturating_sub(STDERR_TAIL_MAX_LINES);
    lines[start..].join("\n")
}
