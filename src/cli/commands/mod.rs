//! CLI command implementations.

mod config;
mod doctor;
mod ingest;
mod serve;
mod summarize;
mod transcribe;

pub use config::run_config;
pub use doctor::run_doctor;
pub use ingest::run_ingest;
pub use serve::{router, run_serve};
pub use summarize::run_summarize;
pub use transcribe::run_transcribe;
