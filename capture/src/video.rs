//! KYC video recorder.
//!
//! ```text
//! Idle → PermissionRequested → Ready → Recording → Stopping → Uploading → Uploaded
//!   ↑            │ (denied)                                        │
//!   └────────────┘                                                 └→ UploadFailed
//! ```
//!
//! The stream is acquired on `PermissionRequested → Ready` and released on
//! every transition out of `Ready`/`Recording`, on `cancel`, and on drop.
//! After a failed upload the recorded bytes are kept so the upload can be
//! retried without re-recording; `discard` is the re-record path.

use std::sync::Arc;
use std::time::Duration;

use loanflow_client::{Backend, VideoReceipt};
use loanflow_types::{Clock, DraftId, FlowParams, Timestamp, UploadStatus, VideoArtifact};
use tracing::{debug, info, warn};

use crate::device::{MediaConstraints, MediaDevice, StreamGuard};
use crate::error::RecorderError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    PermissionRequested,
    Ready,
    Recording { started_at: Timestamp },
    /// Resting state after [`VideoCaptureRecorder::stop`]: the device is
    /// released and the clip assembled. Stays here until an upload starts.
    Stopping,
    Uploading,
    Uploaded { reference: String },
    UploadFailed { reason: String },
}

impl RecorderState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PermissionRequested => "requesting permission",
            Self::Ready => "ready",
            Self::Recording { .. } => "recording",
            Self::Stopping => "stopping",
            Self::Uploading => "uploading",
            Self::Uploaded { .. } => "uploaded",
            Self::UploadFailed { .. } => "upload failed",
        }
    }
}

pub struct VideoCaptureRecorder {
    device: Arc<dyn MediaDevice>,
    backend: Arc<dyn Backend>,
    clock: Arc<dyn Clock>,
    constraints: MediaConstraints,
    min_duration_ms: u64,
    chunk_interval: Duration,
    state: RecorderState,
    stream: Option<StreamGuard>,
    chunks: Vec<Vec<u8>>,
    artifact: Option<VideoArtifact>,
}

impl VideoCaptureRecorder {
    pub fn new(
        device: Arc<dyn MediaDevice>,
        backend: Arc<dyn Backend>,
        clock: Arc<dyn Clock>,
        params: &FlowParams,
    ) -> Self {
        Self {
            device,
            backend,
            clock,
            constraints: MediaConstraints::kyc_selfie(),
            min_duration_ms: params.min_recording_ms(),
            chunk_interval: Duration::from_millis(params.chunk_interval_ms),
            state: RecorderState::Idle,
            stream: None,
            chunks: Vec::new(),
            artifact: None,
        }
    }

    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    /// Whether the device stream is currently held.
    pub fn holds_device(&self) -> bool {
        self.stream.is_some()
    }

    pub fn artifact(&self) -> Option<&VideoArtifact> {
        self.artifact.as_ref()
    }

    pub fn uploaded_reference(&self) -> Option<&str> {
        match &self.state {
            RecorderState::Uploaded { reference } => Some(reference),
            _ => None,
        }
    }

    fn invalid(&self, action: &'static str) -> RecorderError {
        RecorderError::InvalidState {
            action,
            state: self.state.name(),
        }
    }

    /// Ask for camera + microphone. Denial leaves the recorder `Idle`.
    pub async fn request_permission(&mut self) -> Result<(), RecorderError> {
        if !matches!(self.state, RecorderState::Idle) {
            return Err(self.invalid("request permission"));
        }
        self.state = RecorderState::PermissionRequested;

        match self.device.open(&self.constraints).await {
            Ok(stream) => {
                self.stream = Some(StreamGuard::new(stream));
                self.state = RecorderState::Ready;
                info!("capture device ready");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "capture device refused");
                self.state = RecorderState::Idle;
                Err(e.into())
            }
        }
    }

    pub fn start(&mut self) -> Result<(), RecorderError> {
        if !matches!(self.state, RecorderState::Ready) || self.stream.is_none() {
            return Err(self.invalid("start recording"));
        }
        let interval = self.chunk_interval;
        if let Some(guard) = self.stream.as_mut() {
            guard.stream().start_recording(interval);
        }
        self.chunks.clear();
        let started_at = self.clock.now();
        self.state = RecorderState::Recording { started_at };
        info!("recording started");
        Ok(())
    }

    /// Milliseconds recorded so far (zero outside `Recording`).
    pub fn elapsed_ms(&self) -> u64 {
        match self.state {
            RecorderState::Recording { started_at } => started_at.elapsed_since(self.clock.now()),
            _ => 0,
        }
    }

    /// Stop stays disabled until the minimum duration is reached.
    pub fn can_stop(&self) -> bool {
        matches!(self.state, RecorderState::Recording { .. })
            && self.elapsed_ms() >= self.min_duration_ms
    }

    /// Pull chunks the stream has flushed into the in-memory buffer.
    pub fn collect_chunks(&mut self) {
        if let (RecorderState::Recording { .. }, Some(guard)) = (&self.state, self.stream.as_mut())
        {
            self.chunks.extend(guard.stream().drain_chunks());
        }
    }

    /// Stop, release the device, and assemble the clip.
    pub fn stop(&mut self) -> Result<&VideoArtifact, RecorderError> {
        if !matches!(self.state, RecorderState::Recording { .. }) {
            return Err(self.invalid("stop recording"));
        }
        let elapsed_ms = self.elapsed_ms();
        if elapsed_ms < self.min_duration_ms {
            return Err(RecorderError::TooShort {
                elapsed_ms,
                min_ms: self.min_duration_ms,
            });
        }

        self.state = RecorderState::Stopping;
        if let Some(mut guard) = self.stream.take() {
            self.chunks.extend(guard.stream().drain_chunks());
            self.chunks.extend(guard.stream().stop_recording());
            // guard drops here and releases the device
        }

        let bytes = std::mem::take(&mut self.chunks).concat();
        if bytes.is_empty() {
            self.state = RecorderState::Idle;
            return Err(RecorderError::EmptyRecording);
        }
        debug!(bytes = bytes.len(), elapsed_ms, "recording assembled");
        Ok(self.artifact.insert(VideoArtifact::new(bytes, elapsed_ms)))
    }

    /// Upload the assembled clip against `draft_id`. Also the retry path
    /// after `UploadFailed`; the bytes are never re-recorded here.
    pub async fn upload(&mut self, draft_id: &DraftId) -> Result<VideoReceipt, RecorderError> {
        if !matches!(
            self.state,
            RecorderState::Stopping | RecorderState::UploadFailed { .. }
        ) {
            return Err(self.invalid("upload"));
        }
        let Some(artifact) = self.artifact.as_mut() else {
            return Err(RecorderError::EmptyRecording);
        };
        artifact.draft_id = Some(draft_id.clone());
        artifact.upload_status = UploadStatus::Pending;
        self.state = RecorderState::Uploading;

        match self.backend.upload_video(draft_id, artifact).await {
            Ok(receipt) => {
                artifact.upload_status = UploadStatus::Uploaded;
                info!(%draft_id, reference = %receipt.reference, "video uploaded");
                self.state = RecorderState::Uploaded {
                    reference: receipt.reference.clone(),
                };
                Ok(receipt)
            }
            Err(e) => {
                artifact.upload_status = UploadStatus::Failed;
                warn!(%draft_id, error = %e, "video upload failed; recording kept for retry");
                self.state = RecorderState::UploadFailed {
                    reason: e.to_string(),
                };
                Err(RecorderError::Upload(e.to_string()))
            }
        }
    }

    /// Drop the recording and return to `Idle` so the applicant can record again.
    pub fn discard(&mut self) {
        self.stream = None;
        self.chunks.clear();
        self.artifact = None;
        self.state = RecorderState::Idle;
        debug!("recording discarded");
    }

    /// Leave the step: release the device from whatever state we are in.
    /// An assembled or uploaded clip is kept.
    pub fn cancel(&mut self) {
        self.stream = None;
        match self.state {
            RecorderState::PermissionRequested
            | RecorderState::Ready
            | RecorderState::Recording { .. } => {
                self.chunks.clear();
                self.state = RecorderState::Idle;
            }
            _ => {}
        }
    }
}

impl Drop for VideoCaptureRecorder {
    fn drop(&mut self) {
        if self.stream.take().is_some() {
            debug!("recorder dropped while holding the device");
        }
    }
}
