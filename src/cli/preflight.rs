//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{MetadataProvider, Settings, StorageProvider};
use crate::error::{Result, TldwError};
use crate::openai::is_api_key_configured;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingest needs yt-dlp, ffmpeg and storage.
    Ingest,
    /// Transcription needs storage and the API key.
    Transcribe,
    /// Summarization needs storage and the API key.
    Summarize,
    /// The server runs every stage.
    Serve,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ingest => {
            check_tool(&settings.source.ytdlp_path, "--version")?;
            check_tool(&settings.segmenter.ffmpeg_path, "-version")?;
            check_backend(settings)?;
        }
        Operation::Transcribe | Operation::Summarize => {
            check_api_key()?;
            check_backend(settings)?;
        }
        Operation::Serve => {
            check_tool(&settings.source.ytdlp_path, "--version")?;
            check_tool(&settings.segmenter.ffmpeg_path, "-version")?;
            check_api_key()?;
            check_backend(settings)?;
        }
    }
    Ok(())
}

/// Whether the configured providers need Supabase credentials.
pub fn needs_supabase(settings: &Settings) -> bool {
    settings.storage.provider == StorageProvider::Supabase
        || settings.metadata.provider == MetadataProvider::Supabase
}

fn check_backend(settings: &Settings) -> Result<()> {
    if !needs_supabase(settings) {
        return Ok(());
    }
    if settings.storage.resolved_url().is_none() {
        return Err(TldwError::Config(
            "SUPABASE_URL not set. Set it with: export SUPABASE_URL='https://<project>.supabase.co'"
                .to_string(),
        ));
    }
    if settings.storage.resolved_api_key().is_none() {
        return Err(TldwError::Config(
            "SUPABASE_KEY not set. Set it with: export SUPABASE_KEY='<anon key>'".to_string(),
        ));
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    if is_api_key_configured() {
        Ok(())
    } else {
        Err(TldwError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        ))
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str, version_arg: &str) -> Result<()> {
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(TldwError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TldwError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(TldwError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
