//! Ingest command implementation.

use crate::backend::Credential;
use crate::cli::output::{format_duration, format_size};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{IngestReport, Orchestrator};
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(
    url: &str,
    token: &str,
    user_id: &str,
    email: &str,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'tldw doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let ack = orchestrator.ingest(url, Credential::new(token), user_id, email);

    Output::info(&format!("Ingest {} queued ({})", ack.job_id, ack.message));

    let spinner = Output::spinner(&format!("Ingesting {}", url));
    let result = ack.task.await;
    spinner.finish_and_clear();

    match result? {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Ingest failed: {}", e));
            Err(e.into())
        }
    }
}

fn print_report(report: &IngestReport) {
    Output::success(&format!(
        "Ingested {} ({} segments)",
        report.title.as_deref().unwrap_or(&report.video_id),
        report.segments_found
    ));
    Output::kv("Video ID", &report.video_id);
    Output::kv(
        "Audio piped",
        &format!(
            "{} in {}",
            format_size(report.transcode.bytes_piped),
            format_duration(report.transcode.elapsed)
        ),
    );
    Output::kv(
        "Uploaded",
        &format!("{}/{}", report.upload.uploaded, report.upload.attempted),
    );

    if !report.transcode.success {
        Output::warning(&format!(
            "Transcoder exited with {:?}; only partial output was collected.",
            report.transcode.exit_code
        ));
    }
    for failure in &report.upload.failed {
        Output::warning(&format!("Segment {} not uploaded: {}", failure.key, failure.error));
    }

    let registration = &report.registration;
    if registration.created_any() {
        Output::kv(
            "Registered",
            &format!(
                "user: {}, video: {}, link: {}",
                registration.user_created, registration.video_created, registration.association_created
            ),
        );
    } else {
        Output::kv("Registered", "already known");
    }

    Output::info(&format!("Next: tldw transcribe {}", report.video_id));
}
