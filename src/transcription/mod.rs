//! Speech recognition for uploaded audio segments.
//!
//! The [`Recognizer`] trait turns one segment's bytes into text; the stage
//! walks a video's segments in order and stores the combined transcript.

mod stage;
mod whisper;

pub use stage::{TranscribeOutcome, TranscriptionStage};
pub use whisper::WhisperRecognizer;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for speech recognition services.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognize speech in one encoded audio segment.
    ///
    /// `file_name` carries the container extension the service needs.
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String>;
}
