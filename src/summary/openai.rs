//! Chat-completion summarizer.

use super::Summarizer;
use crate::config::{Prompts, SummarySettings};
use crate::error::{Result, TldwError};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI chat-based summarizer.
pub struct OpenAiSummarizer {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    prompts: Prompts,
}

impl OpenAiSummarizer {
    pub fn new() -> Result<Self> {
        Self::with_settings(&SummarySettings::default(), None)
    }

    pub fn with_settings(settings: &SummarySettings, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: create_client(timeout)?,
            model: settings.model.clone(),
            temperature: settings.temperature,
            prompts: Prompts::default(),
        })
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    fn user_prompt(&self, chunk: &str) -> String {
        self.prompts.summary_user(chunk)
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    #[instrument(skip(self, chunk), fields(chars = chunk.len()))]
    async fn summarize(&self, chunk: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.summary_system())
                .build()
                .map_err(|e| TldwError::Summarization(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(self.user_prompt(chunk))
                .build()
                .map_err(|e| TldwError::Summarization(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| TldwError::Summarization(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| TldwError::OpenAI(format!("Failed to summarize chunk: {}", e)))?;

        let summary = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| TldwError::Summarization("Empty response from LLM".to_string()))?
            .clone();

        debug!("Summarized chunk into {} characters", summary.len());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_embeds_chunk() {
        let summarizer = OpenAiSummarizer::new().unwrap();
        let prompt = summarizer.user_prompt("the transcript chunk");

        assert!(prompt.contains("the transcript chunk"));
        assert!(!prompt.contains("{{text}}"));
    }
}
