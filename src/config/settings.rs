//! Configuration settings for tldw.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub source: SourceSettings,
    pub segmenter: SegmenterSettings,
    pub upload: UploadSettings,
    pub storage: StorageSettings,
    pub metadata: MetadataSettings,
    pub transcription: TranscriptionSettings,
    pub summary: SummarySettings,
    pub timeouts: TimeoutSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Root directory for local segment output (`chunks/{video_id}` lives below it).
    pub work_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/tldw".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Video source resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Path to the yt-dlp binary.
    pub ytdlp_path: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

/// Transcoder and segmentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterSettings {
    /// Path to the ffmpeg binary.
    pub ffmpeg_path: String,
    /// Duration of each output segment in seconds.
    pub segment_seconds: u32,
    /// Audio encoder passed to `-c:a`.
    pub codec: String,
    /// File extension of the produced segments.
    pub extension: String,
    /// Highest number of segments scanned per video.
    pub max_segments: usize,
}

impl Default for SegmenterSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            segment_seconds: 15,
            codec: "libmp3lame".to_string(),
            extension: "mp3".to_string(),
            max_segments: 1000,
        }
    }
}

/// Segment upload settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UploadSettings {
    /// Maximum concurrent uploads. None uploads every segment at once.
    pub max_concurrent: Option<usize>,
}

/// Object storage provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    /// Supabase Storage REST API (default).
    #[default]
    Supabase,
    /// Local filesystem directory.
    Local,
    /// Process memory (lost on exit).
    Memory,
}

impl std::str::FromStr for StorageProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "supabase" => Ok(StorageProvider::Supabase),
            "local" | "fs" => Ok(StorageProvider::Local),
            "memory" => Ok(StorageProvider::Memory),
            _ => Err(format!("Unknown storage provider: {}", s)),
        }
    }
}

impl std::fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageProvider::Supabase => write!(f, "supabase"),
            StorageProvider::Local => write!(f, "local"),
            StorageProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub provider: StorageProvider,
    /// Supabase project URL. Falls back to `SUPABASE_URL`.
    pub url: Option<String>,
    /// Supabase anon key. Falls back to `SUPABASE_KEY`.
    pub api_key: Option<String>,
    /// Root directory for the local provider.
    pub local_dir: String,
    pub chunks_bucket: String,
    pub transcriptions_bucket: String,
    pub summaries_bucket: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: StorageProvider::Supabase,
            url: None,
            api_key: None,
            local_dir: "~/.tldw/storage".to_string(),
            chunks_bucket: "chunks".to_string(),
            transcriptions_bucket: "transcriptions".to_string(),
            summaries_bucket: "summaries".to_string(),
        }
    }
}

impl StorageSettings {
    /// Supabase project URL from config or environment.
    pub fn resolved_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("SUPABASE_URL").ok())
            .filter(|u| !u.is_empty())
    }

    /// Supabase API key from config or environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("SUPABASE_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

/// Relational metadata provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetadataProvider {
    /// Supabase PostgREST (default).
    #[default]
    Supabase,
    /// Local SQLite database.
    Sqlite,
}

impl std::str::FromStr for MetadataProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "supabase" | "postgrest" => Ok(MetadataProvider::Supabase),
            "sqlite" => Ok(MetadataProvider::Sqlite),
            _ => Err(format!("Unknown metadata provider: {}", s)),
        }
    }
}

impl std::fmt::Display for MetadataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataProvider::Supabase => write!(f, "supabase"),
            MetadataProvider::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Relational metadata settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    pub provider: MetadataProvider,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            provider: MetadataProvider::Supabase,
            sqlite_path: "~/.tldw/metadata.db".to_string(),
        }
    }
}

/// Speech recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// Optional language hint (ISO-639-1).
    pub language: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: None,
        }
    }
}

/// Map-reduce summary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    /// Chat model used per chunk.
    pub model: String,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    pub temperature: f32,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            chunk_size: 10_000,
            chunk_overlap: 500,
            temperature: 0.3,
        }
    }
}

/// Per-call timeouts for external services. Unset means no timeout.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TimeoutSettings {
    pub storage_secs: Option<u64>,
    pub recognizer_secs: Option<u64>,
    pub summarizer_secs: Option<u64>,
}

impl TimeoutSettings {
    pub fn storage(&self) -> Option<Duration> {
        self.storage_secs.map(Duration::from_secs)
    }

    pub fn recognizer(&self) -> Option<Duration> {
        self.recognizer_secs.map(Duration::from_secs)
    }

    pub fn summarizer(&self) -> Option<Duration> {
        self.summarizer_secs.map(Duration::from_secs)
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TldwError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tldw")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded work directory path.
    pub fn work_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.work_dir)
    }

    /// Get the expanded local storage directory path.
    pub fn local_storage_dir(&self) -> PathBuf {
        Self::expand_path(&self.storage.local_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.metadata.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let settings = Settings::default();
        assert_eq!(settings.segmenter.segment_seconds, 15);
        assert_eq!(settings.segmenter.max_segments, 1000);
        assert_eq!(settings.summary.chunk_size, 10_000);
        assert_eq!(settings.summary.chunk_overlap, 500);
        assert!(settings.upload.max_concurrent.is_none());
        assert!(settings.timeouts.storage().is_none());
        assert!(settings.timeouts.recognizer().is_none());
        assert!(settings.timeouts.summarizer().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [storage]
            provider = "local"

            [timeouts]
            summarizer_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(settings.storage.provider, StorageProvider::Local);
        assert_eq!(settings.storage.chunks_bucket, "chunks");
        assert_eq!(settings.timeouts.summarizer(), Some(Duration::from_secs(30)));
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.upload.max_concurrent = Some(4);
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.upload.max_concurrent, Some(4));
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("fs".parse::<StorageProvider>().unwrap(), StorageProvider::Local);
        assert_eq!("SQLite".parse::<MetadataProvider>().unwrap(), MetadataProvider::Sqlite);
        assert!("s3".parse::<StorageProvider>().is_err());
    }
}
