//! CLI module for tldw.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// tldw - too long, didn't watch
///
/// Turns a video URL into uploaded audio segments, a transcript and a cached summary.
#[derive(Parser, Debug)]
#[command(name = "tldw")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Download, segment and upload a video's audio
    Ingest {
        /// Video URL or ID
        url: String,

        /// Access token forwarded to storage
        #[arg(short, long, env = "TLDW_TOKEN", default_value = "")]
        token: String,

        /// User that submitted the video
        #[arg(long, default_value = "local")]
        user_id: String,

        /// Email recorded for the user
        #[arg(long, default_value = "")]
        email: String,
    },

    /// Transcribe a video's uploaded segments
    Transcribe {
        /// Video ID
        video_id: String,

        /// Access token forwarded to storage
        #[arg(short, long, env = "TLDW_TOKEN", default_value = "")]
        token: String,
    },

    /// Summarize a video's transcript
    Summarize {
        /// Video ID
        video_id: String,

        /// Access token forwarded to storage
        #[arg(short, long, env = "TLDW_TOKEN", default_value = "")]
        token: String,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "summary.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest() {
        let cli = Cli::try_parse_from([
            "tldw",
            "-v",
            "ingest",
            "https://youtu.be/dQw4w9WgXcQ",
            "--token",
            "jwt",
            "--user-id",
            "u1",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Ingest { url, token, user_id, .. } => {
                assert_eq!(url, "https://youtu.be/dQw4w9WgXcQ");
                assert_eq!(token, "jwt");
                assert_eq!(user_id, "u1");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
