/// Core error type.
///
/// Adapter crates map their specific errors into this type so the bot core
/// can handle failures consistently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of one link-handling job, tagged by the stage that failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    Extraction(#[source] Error),

    #[error("{0}")]
    Staging(#[source] Error),

    #[error("{0}")]
    Upload(#[source] Error),

    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Extraction(_) => "extraction",
            PipelineError::Staging(_) => "staging",
            PipelineError::Upload(_) => "upload",
            PipelineError::Cancelled => "cancelled",
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            PipelineError::Extraction(_) => {
                "The link could not be resolved. Check that it points to a public video."
            }
            PipelineError::Staging(_) => "The video could not be downloaded. Try again later.",
            PipelineError::Upload(_) => "The video could not be stored. Try again later.",
            PipelineError::Cancelled => "The request was cancelled.",
        }
    }

    /// Chat reply for this failure.
    pub fn user_message(&self) -> String {
        format!(
            "Failed to download or upload video. Error: {self}\n{}",
            self.hint()
        )
    }
}
