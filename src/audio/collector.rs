//! Discovery of the segment files a transcoder run left on disk.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A segment file on local disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentFile {
    pub video_id: String,
    /// Zero-based sequence number.
    pub index: usize,
    pub path: PathBuf,
}

impl SegmentFile {
    /// File name such as `output007.mp3`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Object key the segment is uploaded under.
    pub fn object_key(&self) -> String {
        format!("{}/{}", chunk_prefix(&self.video_id), self.file_name())
    }
}

/// Key prefix shared by every uploaded segment of a video.
pub fn chunk_prefix(video_id: &str) -> String {
    format!("chunks/{}", video_id)
}

/// Segment file name for a sequence index, zero-padded to three digits.
pub fn segment_file_name(index: usize, extension: &str) -> String {
    format!("output{:03}.{}", index, extension)
}

/// Collect segments `0..max_segments` from `output_dir`.
///
/// Numbering is contiguous, so the first missing index ends the scan.
pub fn discover_segments(
    output_dir: &Path,
    video_id: &str,
    extension: &str,
    max_segments: usize,
) -> Vec<SegmentFile> {
    let mut segments = Vec::new();

    for index in 0..max_segments {
        let path = output_dir.join(segment_file_name(index, extension));
        if !path.is_file() {
            break;
        }
        debug!("Found segment {}", path.display());
        segments.push(SegmentFile {
            video_id: video_id.to_string(),
            index,
            path,
        });
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, index: usize) {
        std::fs::write(dir.join(segment_file_name(index, "mp3")), b"id3").unwrap();
    }

    #[test]
    fn test_file_name_padding() {
        assert_eq!(segment_file_name(0, "mp3"), "output000.mp3");
        assert_eq!(segment_file_name(42, "mp3"), "output042.mp3");
        assert_eq!(segment_file_name(999, "ogg"), "output999.ogg");
    }

    #[test]
    fn test_stops_at_first_gap() {
        let dir = tempfile::tempdir().unwrap();
        for i in [0, 1, 2, 3, 4, 6] {
            touch(dir.path(), i);
        }

        let segments = discover_segments(dir.path(), "abc123", "mp3", 1000);

        assert_eq!(segments.len(), 5);
        let indices: Vec<usize> = segments.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_and_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_segments(dir.path(), "abc123", "mp3", 1000).is_empty());
        assert!(discover_segments(&dir.path().join("nope"), "abc123", "mp3", 1000).is_empty());
    }

    #[test]
    fn test_respects_cap() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            touch(dir.path(), i);
        }

        assert_eq!(discover_segments(dir.path(), "abc123", "mp3", 3).len(), 3);
    }

    #[test]
    fn test_other_extensions_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("output000.wav"), b"riff").unwrap();

        assert!(discover_segments(dir.path(), "abc123", "mp3", 1000).is_empty());
    }

    #[test]
    fn test_object_key() {
        let segment = SegmentFile {
            video_id: "abc123".to_string(),
            index: 3,
            path: PathBuf::from("/tmp/tldw/chunks/abc123/output003.mp3"),
        };

        assert_eq!(segment.object_key(), "chunks/abc123/output003.mp3");
    }
}
