use std::{collections::BTreeMap, fmt};

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// A link as submitted by the user. Only trimmed; validation is left to the
/// extractor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VideoLink(String);

impl VideoLink {
    pub fn new(text: &str) -> Self {
        Self(text.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub view_count: Option<u64>,
}

impl VideoMetadata {
    pub fn views_label(&self) -> String {
        self.view_count
            .map(|v| v.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// One concrete rendition of a video, as selected by the extractor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub format_id: String,
    pub ext: String,
    pub height: Option<u32>,
    /// Direct media URL.
    pub url: String,
    /// Headers the source requires when fetching `url`.
    pub http_headers: BTreeMap<String, String>,
    pub filesize: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedVideo {
    pub metadata: VideoMetadata,
    pub stream: StreamDescriptor,
}

/// Object storage key; also the staged file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey(pub String);

impl ObjectKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, safe to use as a local file name.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pre-signed, time-limited GET URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrievalUrl(pub String);

impl fmt::Display for RetrievalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a successful link-handling job.
#[derive(Clone, Debug)]
pub struct Delivery {
    pub metadata: VideoMetadata,
    pub key: ObjectKey,
    pub url: RetrievalUrl,
}
