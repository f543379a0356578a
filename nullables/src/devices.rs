//! Nullable location and camera hardware.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use loanflow_capture::{
    DeviceError, GeolocationError, Geolocator, MediaConstraints, MediaDevice, MediaStream,
    PositionOptions,
};
use loanflow_types::{GeolocationFix, Timestamp};

enum Scripted {
    Answer(Result<GeolocationFix, GeolocationError>),
    /// Never answers; the caller's timeout has to fire.
    Hang,
}

/// A geolocator that replays scripted answers in order, then keeps
/// returning a fixed default fix.
pub struct NullGeolocator {
    script: Mutex<VecDeque<Scripted>>,
    default_fix: GeolocationFix,
    requests: Mutex<Vec<PositionOptions>>,
}

impl NullGeolocator {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_fix: GeolocationFix {
                latitude: 19.0760,
                longitude: 72.8777,
                accuracy: 12.0,
                captured_at: Timestamp::from_secs(1_700_000_000),
            },
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn then_fix(&self, fix: GeolocationFix) -> &Self {
        self.push(Scripted::Answer(Ok(fix)))
    }

    pub fn then_fail(&self, error: GeolocationError) -> &Self {
        self.push(Scripted::Answer(Err(error)))
    }

    pub fn then_hang(&self) -> &Self {
        self.push(Scripted::Hang)
    }

    fn push(&self, step: Scripted) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(step);
        self
    }

    pub fn default_fix(&self) -> GeolocationFix {
        self.default_fix
    }

    /// Options of every request made so far.
    pub fn requests(&self) -> Vec<PositionOptions> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for NullGeolocator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geolocator for NullGeolocator {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<GeolocationFix, GeolocationError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(*options);
        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(Scripted::Answer(answer)) => answer,
            Some(Scripted::Hang) => std::future::pending().await,
            None => Ok(self.default_fix),
        }
    }
}

#[derive(Default)]
struct ProbeState {
    opens: usize,
    releases: usize,
    recording: bool,
    chunk_interval: Option<Duration>,
}

/// Observes the streams a [`NullMediaDevice`] hands out.
#[derive(Clone, Default)]
pub struct StreamProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl StreamProbe {
    fn with<R>(&self, f: impl FnOnce(&mut ProbeState) -> R) -> R {
        f(&mut self.state.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn opens(&self) -> usize {
        self.with(|s| s.opens)
    }

    pub fn releases(&self) -> usize {
        self.with(|s| s.releases)
    }

    /// Streams opened and not yet released.
    pub fn live_streams(&self) -> usize {
        self.with(|s| s.opens - s.releases)
    }

    pub fn is_recording(&self) -> bool {
        self.with(|s| s.recording)
    }

    pub fn chunk_interval(&self) -> Option<Duration> {
        self.with(|s| s.chunk_interval)
    }
}

/// A camera that hands out [`NullStream`]s, or refuses when told to.
pub struct NullMediaDevice {
    probe: StreamProbe,
    deny: Mutex<Option<DeviceError>>,
    chunk: Mutex<Vec<u8>>,
}

impl NullMediaDevice {
    pub fn new() -> Self {
        Self {
            probe: StreamProbe::default(),
            deny: Mutex::new(None),
            chunk: Mutex::new(vec![0x1a; 256]),
        }
    }

    pub fn probe(&self) -> StreamProbe {
        self.probe.clone()
    }

    /// Fail the next `open` with `error`.
    pub fn deny_next(&self, error: DeviceError) {
        *self.deny.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    /// Streams opened from now on produce no data at all.
    pub fn produce_no_data(&self) {
        self.chunk.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Default for NullMediaDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaDevice for NullMediaDevice {
    async fn open(
        &self,
        _constraints: &MediaConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceError> {
        if let Some(error) = self.deny.lock().unwrap_or_else(|e| e.into_inner()).take() {
            return Err(error);
        }
        self.probe.with(|s| s.opens += 1);
        Ok(Box::new(NullStream {
            probe: self.probe.clone(),
            chunk: self.chunk.lock().unwrap_or_else(|e| e.into_inner()).clone(),
            recording: false,
            released: false,
        }))
    }
}

/// Emits one fixed chunk per drain while recording.
pub struct NullStream {
    probe: StreamProbe,
    chunk: Vec<u8>,
    recording: bool,
    released: bool,
}

impl NullStream {
    fn chunk(&self) -> Vec<Vec<u8>> {
        if self.recording && !self.chunk.is_empty() {
            vec![self.chunk.clone()]
        } else {
            Vec::new()
        }
    }
}

impl MediaStream for NullStream {
    fn start_recording(&mut self, chunk_interval: Duration) {
        self.recording = true;
        self.probe.with(|s| {
            s.recording = true;
            s.chunk_interval = Some(chunk_interval);
        });
    }

    fn drain_chunks(&mut self) -> Vec<Vec<u8>> {
        self.chunk()
    }

    fn stop_recording(&mut self) -> Vec<Vec<u8>> {
        let last = self.chunk();
        self.recording = false;
        self.probe.with(|s| s.recording = false);
        last
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.recording = false;
        self.probe.with(|s| {
            s.releases += 1;
            s.recording = false;
        });
    }
}
