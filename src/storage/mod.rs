//! Object storage abstraction for tldw.
//!
//! Segments, transcripts and summaries live in three namespaces (buckets).
//! Providers translate a [`Namespace`] into their own bucket naming.

mod local;
mod memory;
mod supabase;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;
pub use supabase::SupabaseObjectStore;

use crate::config::StorageSettings;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Storage namespace owned by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Uploaded audio segments.
    Chunks,
    /// One transcript per video.
    Transcriptions,
    /// One cached summary per video.
    Summaries,
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Namespace::Chunks => write!(f, "chunks"),
            Namespace::Transcriptions => write!(f, "transcriptions"),
            Namespace::Summaries => write!(f, "summaries"),
        }
    }
}

/// Bucket names per namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buckets {
    pub chunks: String,
    pub transcriptions: String,
    pub summaries: String,
}

impl Buckets {
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self {
            chunks: settings.chunks_bucket.clone(),
            transcriptions: settings.transcriptions_bucket.clone(),
            summaries: settings.summaries_bucket.clone(),
        }
    }

    pub fn name(&self, namespace: Namespace) -> &str {
        match namespace {
            Namespace::Chunks => &self.chunks,
            Namespace::Transcriptions => &self.transcriptions,
            Namespace::Summaries => &self.summaries,
        }
    }
}

impl Default for Buckets {
    fn default() -> Self {
        Self::from_settings(&StorageSettings::default())
    }
}

/// An entry returned by [`ObjectStore::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Name relative to the listed prefix.
    pub name: String,
}

/// Trait for object storage implementations.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object. Existing objects are not overwritten.
    async fn upload(&self, namespace: Namespace, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Fetch an object, failing with `ObjectNotFound` when it does not exist.
    async fn download(&self, namespace: Namespace, key: &str) -> Result<Vec<u8>>;

    /// List the objects directly below `prefix`, sorted by name.
    async fn list(&self, namespace: Namespace, prefix: &str) -> Result<Vec<ObjectEntry>>;

    /// Remove an object.
    async fn delete(&self, namespace: Namespace, key: &str) -> Result<()>;
}

/// Key of a video's transcript in [`Namespace::Transcriptions`].
pub fn transcript_key(video_id: &str) -> String {
    format!("{}.txt", video_id)
}

/// Key of a video's summary in [`Namespace::Summaries`].
pub fn summary_key(video_id: &str) -> String {
    format!("{}.txt", video_id)
}

/// Join a listing prefix and an entry name into a full key.
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(transcript_key("abc123"), "abc123.txt");
        assert_eq!(summary_key("abc123"), "abc123.txt");
        assert_eq!(join_key("chunks/abc123/", "output000.mp3"), "chunks/abc123/output000.mp3");
        assert_eq!(join_key("", "abc123.txt"), "abc123.txt");
    }

    #[test]
    fn test_bucket_names() {
        let buckets = Buckets {
            chunks: "audio".to_string(),
            ..Buckets::default()
        };

        assert_eq!(buckets.name(Namespace::Chunks), "audio");
        assert_eq!(buckets.name(Namespace::Summaries), "summaries");
        assert_eq!(Namespace::Transcriptions.to_string(), "transcriptions");
    }
}
