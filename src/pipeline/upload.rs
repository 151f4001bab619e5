//! Concurrent upload of discovered segments followed by local cleanup.
//!
//! Per-segment failures are collected into the report instead of aborting the
//! batch. Local files are removed after every upload has settled, including
//! the files whose upload failed.

use crate::audio::SegmentFile;
use crate::error::{with_timeout, Result, TldwError};
use crate::storage::{Namespace, ObjectStore};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// One segment that did not make it to storage.
#[derive(Debug, Clone, Serialize)]
pub struct UploadFailure {
    pub index: usize,
    pub key: String,
    pub error: String,
}

/// Aggregate result of an upload fan-out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadReport {
    /// Upload calls issued.
    pub attempted: usize,
    pub uploaded: usize,
    pub failed: Vec<UploadFailure>,
    /// Local files removed afterwards.
    pub deleted: usize,
}

impl UploadReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Upload every segment, wait for all of them, then delete the local files.
///
/// `max_concurrent` of `None` issues every upload at once.
#[instrument(skip(store, segments), fields(count = segments.len()))]
pub async fn upload_segments(
    store: &dyn ObjectStore,
    segments: &[SegmentFile],
    max_concurrent: Option<usize>,
    timeout: Option<Duration>,
) -> UploadReport {
    let limit = max_concurrent.unwrap_or(segments.len()).max(1);

    let mut report = UploadReport {
        attempted: segments.len(),
        ..UploadReport::default()
    };

    // Owned items keep the fan-out future `Send` for spawned callers.
    let jobs: Vec<(usize, String, PathBuf)> = segments
        .iter()
        .map(|segment| (segment.index, segment.object_key(), segment.path.clone()))
        .collect();

    let mut uploads = stream::iter(jobs)
        .map(|(index, key, path)| async move {
            let result = with_timeout(timeout, "segment upload", upload_one(store, &path, &key)).await;
            (index, key, result)
        })
        .buffer_unordered(limit);

    while let Some((index, key, result)) = uploads.next().await {
        match result {
            Ok(()) => {
                debug!("Uploaded {}", key);
                report.uploaded += 1;
            }
            Err(e) => {
                warn!("Upload of {} failed: {}", key, e);
                report.failed.push(UploadFailure {
                    index,
                    key,
                    error: e.to_string(),
                });
            }
        }
    }
    report.failed.sort_by_key(|f| f.index);

    for segment in segments {
        if remove_if_present(&segment.path).await {
            report.deleted += 1;
        }
    }

    if report.all_succeeded() {
        info!("Uploaded {} segments", report.uploaded);
    } else {
        warn!(
            failed = report.failed.len(),
            uploaded = report.uploaded,
            "Some segment uploads failed; local copies were removed anyway"
        );
    }

    report
}

async fn upload_one(store: &dyn ObjectStore, path: &Path, key: &str) -> Result<()> {
    let bytes = tokio::fs::read(path).await?;
    store
        .upload(Namespace::Chunks, key, bytes)
        .await
        .map_err(|e| TldwError::Upload(format!("{}: {}", key, e)))
}

async fn remove_if_present(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to remove {}: {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{discover_segments, segment_file_name};
    use crate::storage::MemoryObjectStore;

    fn write_segments(dir: &Path, count: usize) {
        for i in 0..count {
            std::fs::write(dir.join(segment_file_name(i, "mp3")), format!("seg{i}")).unwrap();
        }
    }

    #[tokio::test]
    async fn test_uploads_then_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        write_segments(dir.path(), 3);
        let segments = discover_segments(dir.path(), "abc123", "mp3", 1000);
        let store = MemoryObjectStore::new();

        let report = upload_segments(&store, &segments, None, None).await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.uploaded, 3);
        assert_eq!(report.deleted, 3);
        assert!(report.all_succeeded());
        assert!(store.contains(Namespace::Chunks, "chunks/abc123/output002.mp3"));
        assert!(!dir.path().join("output000.mp3").exists());
    }

    #[tokio::test]
    async fn test_failed_upload_still_deletes_local_file() {
        let dir = tempfile::tempdir().unwrap();
        write_segments(dir.path(), 2);
        let segments = discover_segments(dir.path(), "abc123", "mp3", 1000);
        let store = MemoryObjectStore::new();
        store
            .upload(Namespace::Chunks, "chunks/abc123/output001.mp3", b"old".to_vec())
            .await
            .unwrap();

        let report = upload_segments(&store, &segments, Some(1), None).await;

        assert_eq!(report.uploaded, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 1);
        assert_eq!(report.deleted, 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let store = MemoryObjectStore::new();
        let report = upload_segments(&store, &[], None, None).await;

        assert_eq!(report.attempted, 0);
        assert_eq!(report.deleted, 0);
        assert_eq!(store.count(Namespace::Chunks), 0);
    }

    #[tokio::test]
    async fn test_fan_out_runs_on_a_spawned_task() {
        let dir = tempfile::tempdir().unwrap();
        write_segments(dir.path(), 4);
        let segments = discover_segments(dir.path(), "abc123", "mp3", 1000);
        let store: std::sync::Arc<dyn ObjectStore> = std::sync::Arc::new(MemoryObjectStore::new());

        let task_store = store.clone();
        let report = tokio::spawn(async move {
            upload_segments(task_store.as_ref(), &segments, Some(2), None).await
        })
        .await
        .unwrap();

        assert_eq!(report.uploaded, 4);
        assert_eq!(report.deleted, 4);
        assert_eq!(store.list(Namespace::Chunks, "chunks/abc123").await.unwrap().len(), 4);
    }
}
