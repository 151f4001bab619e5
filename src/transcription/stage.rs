//! Transcribe every uploaded segment of a video into one transcript.

use super::Recognizer;
use crate::audio::chunk_prefix;
use crate::error::{with_timeout, Result, TldwError};
use crate::storage::{join_key, transcript_key, Namespace, ObjectStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Result of a transcription run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeOutcome {
    pub video_id: String,
    pub transcript: String,
    /// Segments listed at the start of the run.
    pub chunks_processed: usize,
    /// Segments whose text was left out.
    pub recognition_failures: usize,
    pub chunks_deleted: usize,
}

/// Lists, recognizes and then removes a video's uploaded segments.
pub struct TranscriptionStage {
    recognizer: Arc<dyn Recognizer>,
    storage_timeout: Option<Duration>,
    recognizer_timeout: Option<Duration>,
}

impl TranscriptionStage {
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Self {
        Self {
            recognizer,
            storage_timeout: None,
            recognizer_timeout: None,
        }
    }

    pub fn with_timeouts(mut self, storage: Option<Duration>, recognizer: Option<Duration>) -> Self {
        self.storage_timeout = storage;
        self.recognizer_timeout = recognizer;
        self
    }

    /// Transcribe `video_id`'s segments in listing order and store the transcript.
    ///
    /// A segment that fails to download or recognize contributes no text.
    /// Listed segments are deleted once the transcript is stored.
    #[instrument(skip(self, store))]
    pub async fn run(&self, store: &dyn ObjectStore, video_id: &str) -> Result<TranscribeOutcome> {
        let prefix = chunk_prefix(video_id);
        let entries = with_timeout(
            self.storage_timeout,
            "chunk listing",
            store.list(Namespace::Chunks, &prefix),
        )
        .await?;
        let keys: Vec<String> = entries.iter().map(|e| join_key(&prefix, &e.name)).collect();

        info!("Transcribing {} chunks", keys.len());

        let mut transcript = String::new();
        let mut recognition_failures = 0;

        for key in &keys {
            match self.recognize_chunk(store, key).await {
                Ok(text) => {
                    transcript.push_str(&text);
                    transcript.push('\n');
                }
                Err(e) => {
                    warn!("Skipping {}: {}", key, e);
                    recognition_failures += 1;
                }
            }
        }

        with_timeout(
            self.storage_timeout,
            "transcript upload",
            store.upload(
                Namespace::Transcriptions,
                &transcript_key(video_id),
                transcript.clone().into_bytes(),
            ),
        )
        .await?;
        debug!("Stored transcript ({} bytes)", transcript.len());

        let mut chunks_deleted = 0;
        for key in &keys {
            match with_timeout(self.storage_timeout, "chunk delete", store.delete(Namespace::Chunks, key)).await {
                Ok(()) => chunks_deleted += 1,
                Err(e) => warn!("Failed to delete {}: {}", key, e),
            }
        }

        if recognition_failures > 0 {
            warn!(
                failed = recognition_failures,
                total = keys.len(),
                "Transcript is missing text for some chunks"
            );
        }

        Ok(TranscribeOutcome {
            video_id: video_id.to_string(),
            transcript,
            chunks_processed: keys.len(),
            recognition_failures,
            chunks_deleted,
        })
    }

    async fn recognize_chunk(&self, store: &dyn ObjectStore, key: &str) -> Result<String> {
        let audio = with_timeout(
            self.storage_timeout,
            "chunk download",
            store.download(Namespace::Chunks, key),
        )
        .await?;

        let file_name = key.rsplit('/').next().unwrap_or(key);
        with_timeout(
            self.recognizer_timeout,
            "speech recognition",
            self.recognizer.transcribe(audio, file_name),
        )
        .await
        .map_err(|e| match e {
            TldwError::Recognition(_) => e,
            other => TldwError::Recognition(other.to_string()),
        })
    }
}
