//! Recorded KYC video.

use crate::application::DraftId;
use serde::{Deserialize, Serialize};

/// Container format produced by the recorder.
pub const VIDEO_MIME_TYPE: &str = "video/webm";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploaded,
    Failed,
}

/// An assembled recording ready for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub draft_id: Option<DraftId>,
    pub duration_ms: u64,
    pub upload_status: UploadStatus,
}

impl VideoArtifact {
    pub fn new(bytes: Vec<u8>, duration_ms: u64) -> Self {
        Self {
            bytes,
            mime_type: VIDEO_MIME_TYPE,
            draft_id: None,
            duration_ms,
            upload_status: UploadStatus::Pending,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
