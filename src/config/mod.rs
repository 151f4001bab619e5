//! Configuration module for tldw.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, SummaryPrompts};
pub use settings::{
    GeneralSettings, MetadataProvider, MetadataSettings, PromptSettings, SegmenterSettings,
    ServerSettings, Settings, SourceSettings, StorageProvider, StorageSettings, SummarySettings,
    TimeoutSettings, TranscriptionSettings, UploadSettings,
};
