//! Error types for tldw.

use thiserror::Error;

/// Library-level error type for tldw operations.
#[derive(Error, Debug)]
pub enum TldwError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source resolution failed: {0}")]
    SourceResolution(String),

    #[error("Transcoder failed: {0}")]
    Subprocess(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Metadata registration failed: {0}")]
    Registrar(String),

    #[error("Speech recognition failed: {0}")]
    Recognition(String),

    #[error("No transcript found for video {0}")]
    TranscriptMissing(String),

    #[error("Failed to read cached summary: {0}")]
    SummaryCacheRead(String),

    #[error("Summarization failed: {0}")]
    Summarization(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Record store error: {0}")]
    RecordStore(String),

    #[error("Timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TldwError {
    /// Whether this error is the storage "not found" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TldwError::ObjectNotFound(_))
    }
}

/// Result type alias for tldw operations.
pub type Result<T> = std::result::Result<T, TldwError>;

/// Await `fut`, failing with [`TldwError::Timeout`] if a limit is set and expires.
///
/// `None` waits indefinitely.
pub async fn with_timeout<T, F>(
    limit: Option<std::time::Duration>,
    operation: &str,
    fut: F,
) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match limit {
        None => fut.await,
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| TldwError::Timeout {
            operation: operation.to_string(),
            seconds: limit.as_secs(),
        })?,
    }
}
