//! OpenAI client configuration.

use crate::error::{Result, TldwError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client.
///
/// With `timeout` unset, requests are allowed to run indefinitely.
pub fn create_client(timeout: Option<Duration>) -> Result<Client<OpenAIConfig>> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    let http_client = builder
        .build()
        .map_err(|e| TldwError::Config(format!("Failed to create HTTP client: {e}")))?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Check if the OpenAI API key is configured.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok_and(|key| !key.is_empty())
}
