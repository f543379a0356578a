//! Flow parameters: timing windows and thresholds shared by every component.

use serde::{Deserialize, Serialize};

/// Tunable timings of the applicant flow.
///
/// Every field has a serde default so a partial TOML table only overrides
/// what it names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowParams {
    // ── Passcodes ────────────────────────────────────────────────────────
    /// Lifetime of a passcode session, and the manual-resend lockout.
    #[serde(default = "default_otp_window_secs")]
    pub otp_window_secs: u64,

    /// Quiet period after the last identifier edit before an auto-send fires.
    #[serde(default = "default_auto_send_debounce_ms")]
    pub auto_send_debounce_ms: u64,

    // ── Location ─────────────────────────────────────────────────────────
    #[serde(default = "default_geolocation_timeout_secs")]
    pub geolocation_timeout_secs: u64,

    // ── Video ────────────────────────────────────────────────────────────
    /// Stop is refused until the recording reaches this length.
    #[serde(default = "default_min_recording_secs")]
    pub min_recording_secs: u64,

    /// Interval at which the recorder flushes buffered media.
    #[serde(default = "default_chunk_interval_ms")]
    pub chunk_interval_ms: u64,

    // ── DigiLocker ───────────────────────────────────────────────────────
    /// Countdown before the internal completion page returns to the application.
    #[serde(default = "default_auto_advance_secs")]
    pub auto_advance_secs: u64,

    /// How long a persisted handoff context stays usable.
    #[serde(default = "default_handoff_ttl_secs")]
    pub handoff_ttl_secs: u64,
}

fn default_otp_window_secs() -> u64 {
    120
}

fn default_auto_send_debounce_ms() -> u64 {
    500
}

fn default_geolocation_timeout_secs() -> u64 {
    15
}

fn default_min_recording_secs() -> u64 {
    10
}

fn default_chunk_interval_ms() -> u64 {
    1_000
}

fn default_auto_advance_secs() -> u64 {
    5
}

fn default_handoff_ttl_secs() -> u64 {
    30 * 60
}

impl FlowParams {
    pub fn otp_window_ms(&self) -> u64 {
        self.otp_window_secs * 1000
    }

    pub fn min_recording_ms(&self) -> u64 {
        self.min_recording_secs * 1000
    }

    /// Debounce clamped into the 300-800 ms band the auto-send relies on.
    pub fn effective_debounce_ms(&self) -> u64 {
        self.auto_send_debounce_ms.clamp(300, 800)
    }
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            otp_window_secs: default_otp_window_secs(),
            auto_send_debounce_ms: default_auto_send_debounce_ms(),
            geolocation_timeout_secs: default_geolocation_timeout_secs(),
            min_recording_secs: default_min_recording_secs(),
            chunk_interval_ms: default_chunk_interval_ms(),
            auto_advance_secs: default_auto_advance_secs(),
            handoff_ttl_secs: default_handoff_ttl_secs(),
        }
    }
}
