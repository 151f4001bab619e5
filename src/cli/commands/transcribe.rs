//! Transcribe command implementation.

use crate::backend::Credential;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the transcribe command.
pub async fn run_transcribe(video_id: &str, token: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Transcribe, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tldw doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Transcribing {}", video_id));
    let result = orchestrator.transcribe(video_id, &Credential::new(token)).await;
    spinner.finish_and_clear();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            Output::error(&format!("Transcription failed: {}", e));
            return Err(e.into());
        }
    };

    Output::success(&format!(
        "Transcribed {} chunks of {}",
        outcome.chunks_processed - outcome.recognition_failures,
        video_id
    ));
    if outcome.recognition_failures > 0 {
        Output::warning(&format!(
            "{} chunk(s) could not be recognized and were left out.",
            outcome.recognition_failures
        ));
    }
    if outcome.chunks_deleted < outcome.chunks_processed {
        Output::warning(&format!(
            "{} chunk(s) could not be deleted from storage.",
            outcome.chunks_processed - outcome.chunks_deleted
        ));
    }

    Output::header("Transcript");
    Output::block(&outcome.transcript);

    Ok(())
}
