//! Summarize command implementation.

use crate::backend::Credential;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::summary::SummaryStatus;
use anyhow::Result;

/// Run the summarize command.
pub async fn run_summarize(video_id: &str, token: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Summarize, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tldw doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner(&format!("Summarizing {}", video_id));
    let result = orchestrator.summarize(video_id, &Credential::new(token)).await;
    spinner.finish_and_clear();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            Output::error(&format!("Summarization failed: {}", e));
            return Err(e.into());
        }
    };

    match outcome.status {
        SummaryStatus::Cached => Output::info("Summary already exists"),
        SummaryStatus::Done => Output::success(&format!(
            "Summarized {} in {} chunk(s)",
            video_id, outcome.chunks_summarized
        )),
    }

    Output::header("Summary");
    Output::block(&outcome.summary);

    Ok(())
}
