//! Video source resolution.
//!
//! Resolves a remote video URL to a stable video ID plus the audio format to
//! download, and opens that format as an incremental byte stream.

mod youtube;

pub use youtube::YoutubeResolver;

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Audio bytes as they arrive from the network.
pub type AudioStream = BoxStream<'static, Result<Vec<u8>>>;

/// A downloadable rendition of a video.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Provider-specific format identifier.
    pub format_id: String,
    /// Direct media URL.
    pub url: String,
    /// Container extension (webm, m4a, ...).
    pub ext: String,
    /// Audio codec, `None` when the format carries no audio.
    pub acodec: Option<String>,
    /// Video codec, `None` for audio-only formats.
    pub vcodec: Option<String>,
    /// Average audio bitrate in kbit/s.
    pub abr: Option<f64>,
    /// Total bitrate in kbit/s, often the only rate generic extractors report.
    pub tbr: Option<f64>,
    /// Audio sample rate in Hz.
    pub asr: Option<f64>,
    /// Headers the provider requires on the media request.
    #[serde(default)]
    pub http_headers: HashMap<String, String>,
}

impl AudioFormat {
    pub fn has_audio(&self) -> bool {
        self.acodec.as_deref().is_some_and(|c| c != "none")
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && self.vcodec.as_deref().is_none_or(|c| c == "none")
    }

    /// Audio bitrate, falling back to the total bitrate.
    pub fn bitrate(&self) -> Option<f64> {
        self.abr.or(self.tbr)
    }
}

/// A source URL resolved to its video ID and chosen audio format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedSource {
    pub video_id: String,
    pub title: Option<String>,
    pub format: AudioFormat,
}

/// Trait for video source providers.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Resolve a URL to its video ID and highest-quality audio format.
    async fn resolve(&self, url: &str) -> Result<ResolvedSource>;

    /// Open the given format as a byte stream.
    async fn stream_audio(&self, format: &AudioFormat) -> Result<AudioStream>;
}

/// Pick the format with the best audio.
///
/// Formats are ranked by audio bitrate (total bitrate when the audio rate is
/// unknown), then sample rate. On a tie an
/// audio-only format wins over one that also carries video.
pub fn choose_highest_audio(formats: &[AudioFormat]) -> Option<&AudioFormat> {
    formats.iter().filter(|f| f.has_audio()).max_by(|a, b| {
        let key = |f: &AudioFormat| (f.bitrate().unwrap_or(0.0), f.asr.unwrap_or(0.0));
        let (abr_a, asr_a) = key(a);
        let (abr_b, asr_b) = key(b);
        abr_a
            .total_cmp(&abr_b)
            .then(asr_a.total_cmp(&asr_b))
            .then(a.is_audio_only().cmp(&b.is_audio_only()))
    })
}
