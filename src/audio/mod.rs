//! Audio segmentation.
//!
//! The transcoder turns a live audio stream into fixed-duration segment files;
//! the collector finds them once the transcoder has exited.

mod collector;
mod segmenter;

pub use collector::{chunk_prefix, discover_segments, segment_file_name, SegmentFile};
pub use segmenter::{FfmpegTranscoder, TranscodeOutcome, Transcoder};
