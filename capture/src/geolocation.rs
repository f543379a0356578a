//! Geolocation capture: one fresh, high-accuracy fix with a bounded wait.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use loanflow_types::{FlowParams, GeolocationFix};
use tracing::{debug, info, warn};

use crate::error::GeolocationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Zero means a cached fix is never acceptable.
    pub maximum_age: Duration,
}

impl PositionOptions {
    pub fn from_params(params: &FlowParams) -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(params.geolocation_timeout_secs),
            maximum_age: Duration::ZERO,
        }
    }
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self::from_params(&FlowParams::default())
    }
}

/// Source of device positions.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<GeolocationFix, GeolocationError>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum LocationStatus {
    Idle,
    Locating,
    Located(GeolocationFix),
    Failed(GeolocationError),
}

pub struct GeolocationCapture {
    geolocator: Arc<dyn Geolocator>,
    options: PositionOptions,
    status: Mutex<LocationStatus>,
    /// Serializes requests so overlapping taps share one prompt.
    request: tokio::sync::Mutex<()>,
}

impl GeolocationCapture {
    pub fn new(geolocator: Arc<dyn Geolocator>, options: PositionOptions) -> Self {
        Self {
            geolocator,
            options,
            status: Mutex::new(LocationStatus::Idle),
            request: tokio::sync::Mutex::new(()),
        }
    }

    fn set_status(&self, status: LocationStatus) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    pub fn status(&self) -> LocationStatus {
        self.status.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn fix(&self) -> Option<GeolocationFix> {
        match self.status() {
            LocationStatus::Located(fix) => Some(fix),
            _ => None,
        }
    }

    /// Request a fresh fix, replacing any previous fix or failure.
    pub async fn capture(&self) -> Result<GeolocationFix, GeolocationError> {
        let _request = self.request.lock().await;
        self.set_status(LocationStatus::Locating);
        debug!(timeout_secs = self.options.timeout.as_secs(), "requesting location");

        let result = match tokio::time::timeout(
            self.options.timeout,
            self.geolocator.current_position(&self.options),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GeolocationError::Timeout),
        };

        match &result {
            Ok(fix) => {
                info!(accuracy = fix.accuracy, "location captured");
                self.set_status(LocationStatus::Located(*fix));
            }
            Err(e) => {
                warn!(error = %e, "location capture failed");
                self.set_status(LocationStatus::Failed(e.clone()));
            }
        }
        result
    }

    /// Safe to call repeatedly: returns the held fix if there is one,
    /// otherwise tries again regardless of earlier failures.
    pub async fn retry(&self) -> Result<GeolocationFix, GeolocationError> {
        let pending = self.request.lock().await;
        if let LocationStatus::Located(fix) = self.status() {
            return Ok(fix);
        }
        drop(pending);
        self.capture().await
    }
}
