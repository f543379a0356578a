//! Device location fixes.

use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// A single position reading from the device.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeolocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in metres.
    pub accuracy: f64,
    pub captured_at: Timestamp,
}
