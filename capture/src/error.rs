use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable")]
    PositionUnavailable,

    #[error("timed out waiting for a location fix")]
    Timeout,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("camera/microphone permission denied")]
    PermissionDenied,

    #[error("no camera or microphone found")]
    NotFound,

    #[error("device error: {0}")]
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("camera/microphone permission denied")]
    PermissionDenied,

    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("recording is {elapsed_ms}ms, minimum is {min_ms}ms")]
    TooShort { elapsed_ms: u64, min_ms: u64 },

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error("recording produced no data")]
    EmptyRecording,

    #[error("video upload failed: {0}")]
    Upload(String),
}

impl From<DeviceError> for RecorderError {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::PermissionDenied => RecorderError::PermissionDenied,
            DeviceError::NotFound => RecorderError::DeviceUnavailable("not found".into()),
            DeviceError::Other(msg) => RecorderError::DeviceUnavailable(msg),
        }
    }
}
