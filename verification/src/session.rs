//! Passcode session records and per-channel state.

use loanflow_types::{Identifier, IdentifierKind, SessionToken, Timestamp};
use loanflow_utils::format_countdown;
use serde::{Deserialize, Serialize};

use crate::auto_send::AutoSendGuard;

/// One issued passcode session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    pub identifier: Identifier,
    pub kind: IdentifierKind,
    pub token: SessionToken,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    /// Set once the code has been accepted; the token is single-use.
    pub consumed: bool,
}

impl VerificationSession {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Live sessions accept a verify attempt.
    pub fn is_live(&self, now: Timestamp) -> bool {
        !self.consumed && !self.is_expired(now)
    }

    /// Whole seconds left in the window, rounded up.
    pub fn remaining_secs(&self, now: Timestamp) -> u64 {
        self.expires_at.as_millis().saturating_sub(now.as_millis()).div_ceil(1000)
    }
}

/// Everything tracked for one identifier kind.
///
/// Channels never read or write each other's state.
#[derive(Debug, Default)]
pub(crate) struct Channel {
    /// Latest issued session. Kept after consumption so the resend lockout
    /// keeps counting down.
    pub session: Option<VerificationSession>,
    pub in_flight: bool,
    pub verified: Option<Identifier>,
    pub auto_send: AutoSendGuard,
}

impl Channel {
    pub fn has_live_session(&self, now: Timestamp) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_live(now))
    }

    pub fn resend_locked(&self, now: Timestamp) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_expired(now))
    }
}

/// Read-only view of a channel for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelStatus {
    pub kind: IdentifierKind,
    pub verified: bool,
    pub session_live: bool,
    pub send_in_flight: bool,
    pub auto_send_pending: bool,
    /// Seconds until a manual resend is offered; zero when available.
    pub resend_in_secs: u64,
}

impl ChannelStatus {
    /// Caption for the resend control, e.g. `Resend in 1:05`.
    pub fn resend_label(&self) -> String {
        if self.resend_in_secs == 0 {
            "Resend code".to_string()
        } else {
            format!("Resend in {}", format_countdown(self.resend_in_secs))
        }
    }
}
