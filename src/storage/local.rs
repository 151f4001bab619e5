//! Filesystem-backed object store.
//!
//! Each namespace maps to a bucket directory below a root; keys are relative paths.

use super::{Buckets, Namespace, ObjectEntry, ObjectStore};
use crate::error::{Result, TldwError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument};

/// Local filesystem object store.
pub struct LocalObjectStore {
    root: PathBuf,
    buckets: Buckets,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`. Directories are created lazily.
    pub fn new(root: &Path, buckets: Buckets) -> Self {
        Self {
            root: root.to_path_buf(),
            buckets,
        }
    }

    /// Resolve a key to a path, refusing keys that would escape the bucket.
    fn path_for(&self, namespace: Namespace, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(TldwError::InvalidInput(format!("Invalid object key: {}", key)));
        }
        Ok(self.root.join(self.buckets.name(namespace)).join(relative))
    }
}

fn not_found_or(err: std::io::Error, namespace: Namespace, key: &str) -> TldwError {
    if err.kind() == std::io::ErrorKind::NotFound {
        TldwError::ObjectNotFound(format!("{}/{}", namespace, key))
    } else {
        TldwError::Storage(format!("{}/{}: {}", namespace, key, err))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, namespace: Namespace, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(namespace, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // create_new keeps existing objects intact
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| TldwError::Storage(format!("{}/{}: {}", namespace, key, e)))?;
        tokio::io::AsyncWriteExt::write_all(&mut file, &bytes).await?;

        debug!("Stored {}", path.display());
        Ok(())
    }

    async fn download(&self, namespace: Namespace, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(namespace, key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_or(e, namespace, key))
    }

    async fn list(&self, namespace: Namespace, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let trimmed = prefix.trim_end_matches('/');
        let dir = if trimmed.is_empty() {
            self.root.join(self.buckets.name(namespace))
        } else {
            self.path_for(namespace, trimmed)?
        };

        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                entries.push(ObjectEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(entries)
    }

    async fn delete(&self, namespace: Namespace, key: &str) -> Result<()> {
        let path = self.path_for(namespace, key)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or(e, namespace, key))
    }
}
