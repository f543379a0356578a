//! Device capture for the applicant flow.
//!
//! - [`GeolocationCapture`] acquires a single fresh, high-accuracy fix.
//! - [`VideoCaptureRecorder`] owns the camera/microphone stream, enforces the
//!   minimum clip length, and uploads the assembled recording against a draft.
//!
//! Both talk to the device through traits so tests can substitute the
//! nullable implementations.

pub mod device;
pub mod error;
pub mod geolocation;
pub mod video;

pub use device::{FacingMode, MediaConstraints, MediaDevice, MediaStream, StreamGuard};
pub use error::{DeviceError, GeolocationError, RecorderError};
pub use geolocation::{GeolocationCapture, Geolocator, LocationStatus, PositionOptions};
pub use video::{RecorderState, VideoCaptureRecorder};
