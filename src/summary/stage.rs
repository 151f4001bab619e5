//! Cached, chunked summarization of a stored transcript.

use super::{Summarizer, TextSplitter};
use crate::error::{with_timeout, Result, TldwError};
use crate::storage::{summary_key, transcript_key, Namespace, ObjectStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Whether a summary was served from storage or generated now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummaryStatus {
    #[serde(rename = "summary already exists")]
    Cached,
    #[serde(rename = "done")]
    Done,
}

impl SummaryStatus {
    pub fn message(&self) -> &'static str {
        match self {
            SummaryStatus::Cached => "summary already exists",
            SummaryStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of a summarization run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeOutcome {
    pub video_id: String,
    pub summary: String,
    pub status: SummaryStatus,
    /// Summarizer calls made by this run.
    pub chunks_summarized: usize,
}

/// Returns the cached summary of a video, generating and caching it first if needed.
pub struct SummarizationStage {
    summarizer: Arc<dyn Summarizer>,
    splitter: TextSplitter,
    storage_timeout: Option<Duration>,
    summarizer_timeout: Option<Duration>,
}

impl SummarizationStage {
    pub fn new(summarizer: Arc<dyn Summarizer>, splitter: TextSplitter) -> Self {
        Self {
            summarizer,
            splitter,
            storage_timeout: None,
            summarizer_timeout: None,
        }
    }

    pub fn with_timeouts(mut self, storage: Option<Duration>, summarizer: Option<Duration>) -> Self {
        self.storage_timeout = storage;
        self.summarizer_timeout = summarizer;
        self
    }

    #[instrument(skip(self, store))]
    pub async fn run(&self, store: &dyn ObjectStore, video_id: &str) -> Result<SummarizeOutcome> {
        let key = summary_key(video_id);

        match with_timeout(
            self.storage_timeout,
            "summary download",
            store.download(Namespace::Summaries, &key),
        )
        .await
        {
            Ok(bytes) => {
                info!("Summary already exists");
                return Ok(SummarizeOutcome {
                    video_id: video_id.to_string(),
                    summary: String::from_utf8_lossy(&bytes).into_owned(),
                    status: SummaryStatus::Cached,
                    chunks_summarized: 0,
                });
            }
            Err(e) if e.is_not_found() => debug!("No cached summary"),
            Err(e) => return Err(TldwError::SummaryCacheRead(e.to_string())),
        }

        let transcript = self.load_transcript(store, video_id).await?;
        let chunks = self.splitter.split(&transcript);
        info!("Summarizing {} chunks", chunks.len());

        let mut summary = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let part = with_timeout(
                self.summarizer_timeout,
                "chunk summary",
                self.summarizer.summarize(chunk),
            )
            .await?;
            debug!("Chunk {} summarized", i);
            summary.push_str(&part);
            summary.push('\n');
        }

        with_timeout(
            self.storage_timeout,
            "summary upload",
            store.upload(Namespace::Summaries, &key, summary.clone().into_bytes()),
        )
        .await?;

        Ok(SummarizeOutcome {
            video_id: video_id.to_string(),
            summary,
            status: SummaryStatus::Done,
            chunks_summarized: chunks.len(),
        })
    }

    async fn load_transcript(&self, store: &dyn ObjectStore, video_id: &str) -> Result<String> {
        let bytes = with_timeout(
            self.storage_timeout,
            "transcript download",
            store.download(Namespace::Transcriptions, &transcript_key(video_id)),
        )
        .await
        .map_err(|e| {
            if e.is_not_found() {
                TldwError::TranscriptMissing(video_id.to_string())
            } else {
                e
            }
        })?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
