//! tldw - video to transcript to summary
//!
//! Pulls the audio track of a remote video, cuts it into short segments,
//! stores them, transcribes them, and summarizes the transcript.
//!
//! # Overview
//!
//! The pipeline has three stages keyed by video ID:
//! - **ingest**: resolve the source, stream its best audio into ffmpeg,
//!   upload the resulting segments and register user/video metadata
//! - **transcribe**: recognize every uploaded segment in order and store the transcript
//! - **summarize**: split the transcript, summarize each chunk and cache the result
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `audio_source` - Source resolution and audio streaming (yt-dlp)
//! - `audio` - Segmenting transcoder and segment discovery
//! - `storage` - Object storage abstraction (Supabase, local, memory)
//! - `metadata` - Relational records and the registrar (Supabase, SQLite)
//! - `backend` - Per-credential store construction
//! - `pipeline` - Upload fan-out
//! - `transcription` - Speech recognition and the transcription stage
//! - `summary` - Text splitting, summarization and the summarization stage
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use tldw::backend::Credential;
//! use tldw::config::Settings;
//! use tldw::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!     let credential = Credential::new("user-access-token");
//!
//!     let ack = orchestrator.ingest("https://youtu.be/dQw4w9WgXcQ", credential.clone(), "user-1", "a@b.c");
//!     let report = ack.task.await??;
//!
//!     orchestrator.transcribe(&report.video_id, &credential).await?;
//!     let summary = orchestrator.summarize(&report.video_id, &credential).await?;
//!     println!("{}", summary.summary);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod audio_source;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod metadata;
pub mod openai;
pub mod orchestrator;
pub mod pipeline;
pub mod storage;
pub mod summary;
pub mod transcription;

pub use error::{Result, TldwError};
