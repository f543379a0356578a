//! Camera/microphone access.
//!
//! The stream is the one exclusive hardware resource in the flow. It is only
//! ever held inside a [`StreamGuard`], which releases it when dropped.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::DeviceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

/// What the recorder asks the device for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
    pub facing: FacingMode,
    pub width: u32,
    pub height: u32,
}

impl MediaConstraints {
    /// Front camera at a fixed low resolution to bound upload size.
    pub fn kyc_selfie() -> Self {
        Self {
            audio: true,
            video: true,
            facing: FacingMode::User,
            width: 640,
            height: 480,
        }
    }
}

/// Opens capture streams. Opening is the permission prompt.
#[async_trait]
pub trait MediaDevice: Send + Sync {
    async fn open(&self, constraints: &MediaConstraints)
        -> Result<Box<dyn MediaStream>, DeviceError>;
}

/// A live capture stream.
pub trait MediaStream: Send {
    /// Begin encoding, flushing a chunk every `chunk_interval`.
    fn start_recording(&mut self, chunk_interval: Duration);

    /// Drain chunks flushed since the last call.
    fn drain_chunks(&mut self) -> Vec<Vec<u8>>;

    /// Stop encoding and return the final partial chunk(s).
    fn stop_recording(&mut self) -> Vec<Vec<u8>>;

    /// Stop every track and give the hardware back. Must be idempotent.
    fn release(&mut self);
}

/// Owns a [`MediaStream`] and releases it on drop.
pub struct StreamGuard {
    stream: Box<dyn MediaStream>,
}

impl StreamGuard {
    pub fn new(stream: Box<dyn MediaStream>) -> Self {
        Self { stream }
    }

    pub fn stream(&mut self) -> &mut dyn MediaStream {
        self.stream.as_mut()
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.stream.release();
        tracing::debug!("capture stream released");
    }
}
