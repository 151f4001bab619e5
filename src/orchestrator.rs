//! Pipeline orchestrator for tldw.
//!
//! `ingest` runs resolve, transcode, collect, upload and register on a
//! background task and acknowledges immediately. `transcribe` and `summarize`
//! run their stage to completion against what ingest left in storage.

use crate::audio::{chunk_prefix, discover_segments, FfmpegTranscoder, TranscodeOutcome, Transcoder};
use crate::audio_source::{SourceResolver, YoutubeResolver};
use crate::backend::{Backend, ConfiguredBackend, Credential};
use crate::config::{Prompts, Settings};
use crate::error::{Result, TldwError};
use crate::metadata::{MetadataRegistrar, Registration};
use crate::pipeline::{upload_segments, UploadReport};
use crate::summary::{OpenAiSummarizer, SummarizationStage, SummarizeOutcome, Summarizer, TextSplitter};
use crate::transcription::{Recognizer, TranscribeOutcome, TranscriptionStage, WhisperRecognizer};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

/// Message returned to ingest callers, whatever the background outcome.
pub const INGEST_ACK_MESSAGE: &str = "done";

/// Acknowledgement of a queued ingest.
#[derive(Debug)]
pub struct IngestAck {
    pub job_id: Uuid,
    pub accepted_at: DateTime<Utc>,
    pub message: &'static str,
    /// Background task. Dropping it detaches the task.
    pub task: JoinHandle<Result<IngestReport>>,
}

/// What a finished ingest did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub video_id: String,
    pub title: Option<String>,
    pub segments_found: usize,
    pub transcode: TranscodeOutcome,
    pub upload: UploadReport,
    #[serde(skip)]
    pub registration: Registration,
}

/// Collaborators the orchestrator drives.
pub struct Components {
    pub resolver: Arc<dyn SourceResolver>,
    pub transcoder: Arc<dyn Transcoder>,
    pub backend: Arc<dyn Backend>,
    pub recognizer: Arc<dyn Recognizer>,
    pub summarizer: Arc<dyn Summarizer>,
}

/// The main orchestrator for the tldw pipeline.
#[derive(Clone)]
pub struct Orchestrator {
    resolver: Arc<dyn SourceResolver>,
    transcoder: Arc<dyn Transcoder>,
    backend: Arc<dyn Backend>,
    transcription: Arc<TranscriptionStage>,
    summarization: Arc<SummarizationStage>,
    work_dir: PathBuf,
    max_segments: usize,
    max_concurrent_uploads: Option<usize>,
    storage_timeout: Option<Duration>,
}

impl Orchestrator {
    /// Create an orchestrator with the configured providers.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::from_settings(&settings.prompts)?;

        let components = Components {
            resolver: Arc::new(YoutubeResolver::with_binary(&settings.source.ytdlp_path)),
            transcoder: Arc::new(FfmpegTranscoder::with_settings(&settings.segmenter)),
            backend: Arc::new(ConfiguredBackend::from_settings(&settings)?),
            recognizer: Arc::new(WhisperRecognizer::with_settings(
                &settings.transcription,
                settings.timeouts.recognizer(),
            )?),
            summarizer: Arc::new(
                OpenAiSummarizer::with_settings(&settings.summary, settings.timeouts.summarizer())?
                    .with_prompts(prompts),
            ),
        };

        Self::with_components(&settings, components)
    }

    /// Create an orchestrator around explicit collaborators.
    pub fn with_components(settings: &Settings, components: Components) -> Result<Self> {
        let timeouts = &settings.timeouts;

        let transcription = TranscriptionStage::new(components.recognizer)
            .with_timeouts(timeouts.storage(), timeouts.recognizer());
        let summarization = SummarizationStage::new(
            components.summarizer,
            TextSplitter::from_settings(&settings.summary)?,
        )
        .with_timeouts(timeouts.storage(), timeouts.summarizer());

        Ok(Self {
            resolver: components.resolver,
            transcoder: components.transcoder,
            backend: components.backend,
            transcription: Arc::new(transcription),
            summarization: Arc::new(summarization),
            work_dir: settings.work_dir(),
            max_segments: settings.segmenter.max_segments,
            max_concurrent_uploads: settings.upload.max_concurrent,
            storage_timeout: timeouts.storage(),
        })
    }

    /// Queue an ingest and return without waiting for it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn ingest(
        &self,
        source_url: &str,
        credential: Credential,
        user_id: &str,
        user_email: &str,
    ) -> IngestAck {
        let job_id = Uuid::new_v4();
        let span = info_span!("ingest_job", %job_id);

        let this = self.clone();
        let source_url = source_url.to_string();
        let user_id = user_id.to_string();
        let user_email = user_email.to_string();

        let task = tokio::spawn(
            async move {
                let result = this
                    .run_ingest(&source_url, &credential, &user_id, &user_email)
                    .await;
                if let Err(e) = &result {
                    error!("Ingest of {} failed: {}", source_url, e);
                }
                result
            }
            .instrument(span),
        );

        info!(%job_id, "Ingest queued");

        IngestAck {
            job_id,
            accepted_at: Utc::now(),
            message: INGEST_ACK_MESSAGE,
            task,
        }
    }

    /// Run the whole ingest on the current task.
    #[instrument(skip(self, credential, user_email))]
    pub async fn run_ingest(
        &self,
        source_url: &str,
        credential: &Credential,
        user_id: &str,
        user_email: &str,
    ) -> Result<IngestReport> {
        let resolved = self.resolver.resolve(source_url).await?;
        let video_id = resolved.video_id.clone();
        validate_video_id(&video_id)?;

        let stream = self.resolver.stream_audio(&resolved.format).await?;

        let output_dir = self.work_dir.join(chunk_prefix(&video_id));
        let transcode = self.transcoder.transcode(stream, &output_dir).await?;
        if !transcode.success {
            warn!(
                exit_code = ?transcode.exit_code,
                "{}; collecting partial output",
                TldwError::Subprocess(format!("transcoder exited unsuccessfully for {}", video_id))
            );
        }

        let segments = discover_segments(
            &output_dir,
            &video_id,
            self.transcoder.extension(),
            self.max_segments,
        );
        info!(video_id = %video_id, "Discovered {} segments", segments.len());

        let store = self.backend.object_store(credential)?;
        let upload = upload_segments(
            store.as_ref(),
            &segments,
            self.max_concurrent_uploads,
            self.storage_timeout,
        )
        .await;

        remove_output_dir(&output_dir).await;

        let records = self.backend.record_store(credential)?;
        let registration = MetadataRegistrar::new(records)
            .with_timeout(self.storage_timeout)
            .register(user_id, user_email, &video_id)
            .await?;

        Ok(IngestReport {
            video_id,
            title: resolved.title,
            segments_found: segments.len(),
            transcode,
            upload,
            registration,
        })
    }

    /// Transcribe a video's uploaded segments.
    pub async fn transcribe(&self, video_id: &str, credential: &Credential) -> Result<TranscribeOutcome> {
        validate_video_id(video_id)?;
        let store = self.backend.object_store(credential)?;
        self.transcription.run(store.as_ref(), video_id).await
    }

    /// Summarize a video's transcript, serving the cached summary when present.
    pub async fn summarize(&self, video_id: &str, credential: &Credential) -> Result<SummarizeOutcome> {
        validate_video_id(video_id)?;
        let store = self.backend.object_store(credential)?;
        self.summarization.run(store.as_ref(), video_id).await
    }
}

/// Remove the per-video output directory once it is empty.
///
/// Files left behind (segments past a numbering gap) keep the directory.
async fn remove_output_dir(dir: &Path) -> bool {
    match tokio::fs::remove_dir(dir).await {
        Ok(()) => true,
        Err(e) => {
            debug!("Keeping {}: {}", dir.display(), e);
            false
        }
    }
}

/// Video IDs become path segments and object keys.
fn validate_video_id(video_id: &str) -> Result<()> {
    let valid = !video_id.is_empty()
        && video_id != "."
        && video_id != ".."
        && !video_id.contains(['/', '\\'])
        && !video_id.chars().any(char::is_control);

    if valid {
        Ok(())
    } else {
        Err(TldwError::InvalidInput(format!("Invalid video id: {:?}", video_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_video_id() {
        assert!(validate_video_id("dQw4w9WgXcQ").is_ok());
        assert!(validate_video_id("abc-123_x").is_ok());
        assert!(validate_video_id("").is_err());
        assert!(validate_video_id("..").is_err());
        assert!(validate_video_id("a/b").is_err());
    }

    #[tokio::test]
    async fn test_output_dir_removed_only_when_empty() {
        let root = tempfile::tempdir().unwrap();

        let empty = root.path().join("empty");
        std::fs::create_dir(&empty).unwrap();
        assert!(remove_output_dir(&empty).await);
        assert!(!empty.exists());

        let leftover = root.path().join("leftover");
        std::fs::create_dir(&leftover).unwrap();
        std::fs::write(leftover.join("output006.mp3"), b"x").unwrap();
        assert!(!remove_output_dir(&leftover).await);
        assert!(leftover.join("output006.mp3").exists());

        assert!(!remove_output_dir(&root.path().join("missing")).await);
    }
}
