//! Fan-out steps shared by the ingest stage.

mod upload;

pub use upload::{upload_segments, UploadFailure, UploadReport};
