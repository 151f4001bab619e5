//! OpenAI Whisper recognizer.

use super::Recognizer;
use crate::config::TranscriptionSettings;
use crate::error::{Result, TldwError};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioInput, CreateTranscriptionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Whisper-based recognizer.
pub struct WhisperRecognizer {
    client: Client<OpenAIConfig>,
    model: String,
    language: Option<String>,
}

impl WhisperRecognizer {
    /// Create a recognizer with default settings.
    pub fn new() -> Result<Self> {
        Self::with_settings(&TranscriptionSettings::default(), None)
    }

    pub fn with_settings(settings: &TranscriptionSettings, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: create_client(timeout)?,
            model: settings.model.clone(),
            language: settings.language.clone(),
        })
    }
}

#[async_trait]
impl Recognizer for WhisperRecognizer {
    #[instrument(skip(self, audio), fields(size = audio.len()))]
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String> {
        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(file_name.to_string(), audio))
            .model(&self.model);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| TldwError::Recognition(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| TldwError::Recognition(format!("Whisper API error: {}", e)))?;

        debug!("Recognized {} characters", response.text.len());
        Ok(response.text)
    }
}
