//! Transcript summarization.
//!
//! Long transcripts are split into overlapping chunks; each chunk goes
//! through a [`Summarizer`] and the results are concatenated and cached.

mod openai;
mod splitter;
mod stage;

pub use openai::OpenAiSummarizer;
pub use splitter::TextSplitter;
pub use stage::{SummarizationStage, SummarizeOutcome, SummaryStatus};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for summarization services.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Extract the key points of one transcript chunk.
    async fn summarize(&self, chunk: &str) -> Result<String>;
}
