//! YouTube source implementation backed by yt-dlp.

use super::{choose_highest_audio, AudioFormat, AudioStream, ResolvedSource, SourceResolver};
use crate::error::{Result, TldwError};
use async_trait::async_trait;
use futures::StreamExt;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Resolves YouTube URLs with `yt-dlp --dump-json` and streams the chosen format over HTTP.
pub struct YoutubeResolver {
    ytdlp_path: String,
    client: reqwest::Client,
    video_id_regex: Regex,
}

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: String,
    title: Option<String>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    format_id: String,
    url: Option<String>,
    ext: Option<String>,
    acodec: Option<String>,
    vcodec: Option<String>,
    abr: Option<f64>,
    tbr: Option<f64>,
    asr: Option<f64>,
    #[serde(default)]
    http_headers: HashMap<String, String>,
}

impl YtDlpFormat {
    /// Formats without a direct URL (storyboards, manifests) are dropped.
    fn into_audio_format(self) -> Option<AudioFormat> {
        Some(AudioFormat {
            format_id: self.format_id,
            url: self.url?,
            ext: self.ext.unwrap_or_else(|| "bin".to_string()),
            acodec: self.acodec,
            vcodec: self.vcodec,
            abr: self.abr,
            tbr: self.tbr,
            asr: self.asr,
            http_headers: self.http_headers,
        })
    }
}

impl YoutubeResolver {
    pub fn new() -> Self {
        Self::with_binary("yt-dlp")
    }

    pub fn with_binary(ytdlp_path: &str) -> Self {
        // Matches various YouTube URL formats and bare video IDs
        let video_id_regex = Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex");

        Self {
            ytdlp_path: ytdlp_path.to_string(),
            client: reqwest::Client::new(),
            video_id_regex,
        }
    }

    /// Extract video ID from a YouTube URL or bare ID.
    fn extract_video_id(&self, input: &str) -> Option<String> {
        let caps = self.video_id_regex.captures(input.trim())?;

        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    }

    /// Normalize input to a URL yt-dlp accepts.
    fn source_url(&self, input: &str) -> Result<String> {
        let input = input.trim();
        if let Some(video_id) = self.extract_video_id(input) {
            return Ok(format!("https://www.youtube.com/watch?v={}", video_id));
        }

        let parsed = url::Url::parse(input)
            .map_err(|e| TldwError::SourceResolution(format!("Invalid source URL {input}: {e}")))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed.to_string()),
            scheme => Err(TldwError::SourceResolution(format!(
                "Unsupported URL scheme: {scheme}"
            ))),
        }
    }

    fn parse_info(json: &[u8]) -> Result<ResolvedSource> {
        let info: YtDlpInfo = serde_json::from_slice(json).map_err(|e| {
            TldwError::SourceResolution(format!("Failed to parse yt-dlp output: {}", e))
        })?;

        let formats: Vec<AudioFormat> = info
            .formats
            .into_iter()
            .filter_map(YtDlpFormat::into_audio_format)
            .collect();

        let format = choose_highest_audio(&formats).cloned().ok_or_else(|| {
            TldwError::SourceResolution(format!("No audio format available for {}", info.id))
        })?;

        Ok(ResolvedSource {
            video_id: info.id,
            title: info.title,
            format,
        })
    }
}

impl Default for YoutubeResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn header_map(headers: &HashMap<String, String>) -> HeaderMap {
    headers
        .iter()
        .filter_map(|(k, v)| {
            let name = HeaderName::from_bytes(k.as_bytes()).ok()?;
            let value = HeaderValue::from_str(v).ok()?;
            Some((name, value))
        })
        .collect()
}

#[async_trait]
impl SourceResolver for YoutubeResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, url: &str) -> Result<ResolvedSource> {
        let source_url = self.source_url(url)?;

        let output = tokio::process::Command::new(&self.ytdlp_path)
            .args([
                "--dump-json",
                "--no-download",
                "--no-playlist",
                "--no-warnings",
                &source_url,
            ])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TldwError::ToolNotFound(self.ytdlp_path.clone())
                } else {
                    TldwError::SourceResolution(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TldwError::SourceResolution(format!(
                "Video {} not found or unavailable: {}",
                source_url,
                stderr.trim()
            )));
        }

        let resolved = Self::parse_info(&output.stdout)?;
        info!(
            video_id = %resolved.video_id,
            format = %resolved.format.format_id,
            bitrate = ?resolved.format.bitrate(),
            "Resolved source"
        );
        Ok(resolved)
    }

    async fn stream_audio(&self, format: &AudioFormat) -> Result<AudioStream> {
        debug!("Opening audio stream for format {}", format.format_id);

        let response = self
            .client
            .get(&format.url)
            .headers(header_map(&format.http_headers))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TldwError::SourceResolution(format!("Audio download failed: {}", e)))?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(TldwError::from))
            .boxed();

        Ok(stream)
    }
}
