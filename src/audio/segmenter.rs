//! Streams source audio into ffmpeg and lets it cut fixed-duration segments.

use crate::audio_source::AudioStream;
use crate::config::SegmenterSettings;
use crate::error::{Result, TldwError};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tracing::{debug, info, instrument, warn};

/// How a transcoder run ended.
#[derive(Debug, Clone, Serialize)]
pub struct TranscodeOutcome {
    /// Process exit code, `None` if killed by a signal.
    pub exit_code: Option<i32>,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Bytes written to the process input.
    pub bytes_piped: u64,
    pub elapsed: Duration,
}

/// Turns an audio byte stream into numbered segment files in a directory.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Consume `input` and write segments into `output_dir`.
    ///
    /// Returns once the process has exited, whatever its exit code.
    async fn transcode(&self, input: AudioStream, output_dir: &Path) -> Result<TranscodeOutcome>;

    /// Extension of the segment files this transcoder writes.
    fn extension(&self) -> &str;
}

/// ffmpeg-based segmenter reading from `pipe:0`.
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
    segment_seconds: u32,
    codec: String,
    extension: String,
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self::with_settings(&SegmenterSettings::default())
    }

    pub fn with_settings(settings: &SegmenterSettings) -> Self {
        Self {
            ffmpeg_path: settings.ffmpeg_path.clone(),
            segment_seconds: settings.segment_seconds,
            codec: settings.codec.clone(),
            extension: settings.extension.clone(),
        }
    }

    /// Output path pattern handed to the segment muxer.
    fn output_pattern(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("output%03d.{}", self.extension))
    }

    fn args(&self, output_dir: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
            // Audio only; a muxed source must not leak video into the segments
            "-map".to_string(),
            "0:a".to_string(),
            "-f".to_string(),
            "segment".to_string(),
            "-segment_time".to_string(),
            self.segment_seconds.to_string(),
            "-c:a".to_string(),
            self.codec.clone(),
            self.output_pattern(output_dir).to_string_lossy().into_owned(),
        ]
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy the stream into `sink` chunk by chunk, returning the bytes written.
///
/// A failing source or a closed sink ends the copy early; whatever was
/// written so far still reaches the transcoder.
async fn pipe_stream<W>(mut input: AudioStream, sink: &mut W) -> u64
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;

    while let Some(chunk) = input.next().await {
        match chunk {
            Ok(bytes) => {
                if let Err(e) = sink.write_all(&bytes).await {
                    warn!("Transcoder stopped accepting input: {}", e);
                    break;
                }
                written += bytes.len() as u64;
            }
            Err(e) => {
                warn!("Source stream failed after {} bytes: {}", written, e);
                break;
            }
        }
    }

    if let Err(e) = sink.shutdown().await {
        debug!("Closing transcoder input: {}", e);
    }

    written
}

async fn drain_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.is_empty() {
            warn!("ffmpeg: {}", line);
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    #[instrument(skip(self, input), fields(output_dir = %output_dir.display()))]
    async fn transcode(&self, input: AudioStream, output_dir: &Path) -> Result<TranscodeOutcome> {
        tokio::fs::create_dir_all(output_dir).await?;

        let start = Instant::now();

        let mut child = Command::new(&self.ffmpeg_path)
            .args(self.args(output_dir))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TldwError::ToolNotFound(self.ffmpeg_path.clone())
                } else {
                    TldwError::Subprocess(format!("Failed to spawn ffmpeg: {}", e))
                }
            })?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(stderr));
        }

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TldwError::Subprocess("ffmpeg stdin not captured".to_string()))?;

        let bytes_piped = pipe_stream(input, &mut stdin).await;
        drop(stdin);

        let status = child
            .wait()
            .await
            .map_err(|e| TldwError::Subprocess(format!("Failed to wait for ffmpeg: {}", e)))?;

        let outcome = TranscodeOutcome {
            exit_code: status.code(),
            success: status.success(),
            bytes_piped,
            elapsed: start.elapsed(),
        };

        if outcome.success {
            info!(
                "Transcoding done in {:.1}s ({} bytes)",
                outcome.elapsed.as_secs_f64(),
                bytes_piped
            );
        } else {
            // Partial output is still scanned and uploaded.
            let err = TldwError::Subprocess(format!("ffmpeg exited with {}", status));
            warn!("{}; continuing with partial output", err);
        }

        Ok(outcome)
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}
