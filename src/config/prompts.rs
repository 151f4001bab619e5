//! Prompt templates for tldw.
//!
//! A `summary.toml` in the configured prompts directory replaces the built-in
//! summary prompt. Templates reference variables as `{{name}}`; the transcript
//! chunk is always available as `{{text}}`.

use super::PromptSettings;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const SUMMARY_FILE: &str = "summary.toml";

/// Prompt templates plus the user-defined variables they may reference.
#[derive(Debug, Clone, Default)]
pub struct Prompts {
    pub summary: SummaryPrompts,
    variables: HashMap<String, String>,
}

/// Prompts for the per-chunk summary call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    pub system: String,
    pub user: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            system: "You summarize video transcripts. Be faithful to the transcript and never add facts that are not in it."
                .to_string(),

            user: r#"Extract the key points from the following part of a video transcript for a viewer who has not watched the video.

Transcript:
{{text}}

Key points:"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Built-in prompts overridden by whatever the prompt settings point at.
    pub fn from_settings(settings: &PromptSettings) -> Result<Self> {
        let summary = match &settings.custom_dir {
            Some(dir) => read_override(&expand(dir).join(SUMMARY_FILE))?,
            None => None,
        };

        Ok(Self {
            summary: summary.unwrap_or_default(),
            variables: settings.variables.clone(),
        })
    }

    /// Summary prompts with extra template variables.
    pub fn with_variables(mut self, variables: HashMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    /// Render the summary user prompt around one transcript chunk.
    ///
    /// `{{text}}` always resolves to the chunk, even if a configured variable
    /// shares the name.
    pub fn summary_user(&self, chunk: &str) -> String {
        render(&self.summary.user, |name| match name {
            "text" => Some(chunk),
            other => self.variables.get(other).map(String::as_str),
        })
    }

    pub fn summary_system(&self) -> String {
        render(&self.summary.system, |name| {
            self.variables.get(name).map(String::as_str)
        })
    }
}

fn expand(dir: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(dir).as_ref())
}

fn read_override(path: &Path) -> Result<Option<SummaryPrompts>> {
    if !path.exists() {
        return Ok(None);
    }
    debug!("Loading summary prompt from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Substitute `{{name}}` placeholders in a single pass. Unknown names are left as written.
fn render<'a>(template: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match lookup(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}
