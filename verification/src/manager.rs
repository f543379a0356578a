//! Verification session manager: issues and checks passcodes per identifier kind.
//!
//! State lives behind a short-lived mutex that is never held across a backend
//! call, so phone, email and secondary-email flows can all be awaited at the
//! same time without contending.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::join_all;
use loanflow_client::Backend;
use loanflow_types::{
    Clock, FlowParams, Identifier, IdentifierKind, OtpCode, SessionToken, Timestamp,
};
use tracing::{debug, info, warn};

use crate::auto_send::{AutoSendDecision, SkipReason};
use crate::error::VerificationError;
use crate::session::{Channel, ChannelStatus, VerificationSession};

/// Result of a send request that did not fail on the network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Sent {
        token: SessionToken,
        expires_at: Timestamp,
    },
    /// Nothing was sent and no network call was made.
    Skipped(SkipReason),
}

pub struct VerificationSessionManager {
    backend: Arc<dyn Backend>,
    clock: Arc<dyn Clock>,
    window_ms: u64,
    debounce_ms: u64,
    channels: Mutex<HashMap<IdentifierKind, Channel>>,
}

/// Clears a channel's in-flight flag however the send future ends.
struct InFlight<'a> {
    manager: &'a VerificationSessionManager,
    kind: IdentifierKind,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.manager.channel(self.kind, |c| c.in_flight = false);
    }
}

impl VerificationSessionManager {
    pub fn new(backend: Arc<dyn Backend>, clock: Arc<dyn Clock>, params: &FlowParams) -> Self {
        Self {
            backend,
            clock,
            window_ms: params.otp_window_ms(),
            debounce_ms: params.effective_debounce_ms(),
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<IdentifierKind, Channel>> {
        // A panic while holding the lock cannot leave a channel half-written.
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn channel<R>(&self, kind: IdentifierKind, f: impl FnOnce(&mut Channel) -> R) -> R {
        let mut channels = self.lock();
        f(channels.entry(kind).or_default())
    }

    /// Issue a passcode for `raw`.
    ///
    /// Invalid input and a concurrent send for the same kind are no-ops. A
    /// successful send replaces (and so invalidates) the previous session.
    pub async fn send(
        &self,
        kind: IdentifierKind,
        raw: &str,
    ) -> Result<SendOutcome, VerificationError> {
        let identifier = match Identifier::parse(kind, raw) {
            Ok(identifier) => identifier,
            Err(e) => {
                debug!(%kind, error = %e, "send skipped: identifier not well-formed");
                return Ok(SendOutcome::Skipped(SkipReason::Incomplete));
            }
        };
        self.send_identifier(kind, identifier).await
    }

    /// Human-triggered resend: only offered once the current window has elapsed.
    pub async fn resend(
        &self,
        kind: IdentifierKind,
        raw: &str,
    ) -> Result<SendOutcome, VerificationError> {
        let now = self.clock.now();
        if self.channel(kind, |c| c.resend_locked(now)) {
            return Ok(SendOutcome::Skipped(SkipReason::SessionActive));
        }
        self.send(kind, raw).await
    }

    async fn send_identifier(
        &self,
        kind: IdentifierKind,
        identifier: Identifier,
    ) -> Result<SendOutcome, VerificationError> {
        let claimed = self.channel(kind, |c| {
            if c.in_flight {
                false
            } else {
                c.in_flight = true;
                true
            }
        });
        if !claimed {
            debug!(%kind, "send skipped: already in flight");
            return Ok(SendOutcome::Skipped(SkipReason::InFlight));
        }
        let _in_flight = InFlight {
            manager: self,
            kind,
        };

        let issued = self.backend.send_otp(kind, &identifier).await.map_err(|e| {
            warn!(%kind, error = %e, "passcode send failed");
            VerificationError::from(e)
        })?;

        let issued_at = self.clock.now();
        let expires_at = issued_at.plus_millis(self.window_ms);
        let token = issued.session_token;
        self.channel(kind, |c| {
            c.auto_send.record_sent(identifier.clone());
            c.session = Some(VerificationSession {
                identifier,
                kind,
                token: token.clone(),
                issued_at,
                expires_at,
                consumed: false,
            });
        });
        info!(%kind, %expires_at, "passcode sent");
        Ok(SendOutcome::Sent { token, expires_at })
    }

    /// Check `code` against the current session for `kind`.
    pub async fn verify(&self, kind: IdentifierKind, code: &str) -> Result<(), VerificationError> {
        let token = self
            .channel(kind, |c| c.session.as_ref().map(|s| s.token.clone()))
            .ok_or(VerificationError::SessionExpired)?;
        self.verify_token(&token, code).await
    }

    /// Check `code` against the session identified by `token`.
    ///
    /// An expired, consumed, superseded or unknown token always yields
    /// `SessionExpired`, before the code is compared.
    pub async fn verify_token(
        &self,
        token: &SessionToken,
        code: &str,
    ) -> Result<(), VerificationError> {
        let code = OtpCode::parse(code).map_err(|_| VerificationError::Malformed)?;

        let now = self.clock.now();
        let kind = {
            let channels = self.lock();
            channels
                .iter()
                .find(|(_, c)| {
                    c.session
                        .as_ref()
                        .is_some_and(|s| &s.token == token && s.is_live(now))
                })
                .map(|(kind, _)| *kind)
        }
        .ok_or(VerificationError::SessionExpired)?;

        let matched = self.backend.verify_otp(token, &code).await.map_err(|e| {
            warn!(%kind, error = %e, "passcode verify failed");
            VerificationError::from(e)
        })?;
        if !matched {
            debug!(%kind, "incorrect passcode");
            return Err(VerificationError::InvalidCode);
        }

        // A resend may have replaced the session while the check was in flight.
        let now = self.clock.now();
        self.channel(kind, |c| match c.session.as_mut() {
            Some(s) if &s.token == token && s.is_live(now) => {
                s.consumed = true;
                c.verified = Some(s.identifier.clone());
                c.auto_send.cancel();
                info!(%kind, "identifier verified");
                Ok(())
            }
            _ => Err(VerificationError::SessionExpired),
        })
    }

    /// Feed an edit of the identifier field for `kind`.
    ///
    /// Changing a verified identifier to a different value withdraws its
    /// verification.
    pub fn on_identifier_changed(&self, kind: IdentifierKind, raw: &str) -> AutoSendDecision {
        let now = self.clock.now();
        let identifier = Identifier::parse(kind, raw).ok();
        let debounce_ms = self.debounce_ms;
        self.channel(kind, |c| {
            if c.verified.is_some() && c.verified != identifier {
                info!(%kind, "verified identifier edited; verification withdrawn");
                c.verified = None;
            }
            let blocked = if c.verified.is_some() {
                Some(SkipReason::AlreadyVerified)
            } else if c.in_flight {
                Some(SkipReason::InFlight)
            } else if c.has_live_session(now) {
                Some(SkipReason::SessionActive)
            } else {
                None
            };
            c.auto_send.on_change(identifier, blocked, now, debounce_ms)
        })
    }

    /// Fire every pending auto-send whose debounce has elapsed.
    ///
    /// Conditions are re-checked at fire time; channels fire concurrently.
    pub async fn fire_due(&self) -> Vec<(IdentifierKind, Result<SendOutcome, VerificationError>)> {
        let now = self.clock.now();
        let due: Vec<(IdentifierKind, Identifier)> = {
            let mut channels = self.lock();
            channels
                .iter_mut()
                .filter_map(|(kind, c)| {
                    let identifier = c.auto_send.take_due(now)?;
                    let still_eligible = c.verified.is_none()
                        && !c.in_flight
                        && !c.has_live_session(now)
                        && c.auto_send.last_sent() != Some(&identifier);
                    still_eligible.then_some((*kind, identifier))
                })
                .collect()
        };

        let sends = due.into_iter().map(|(kind, identifier)| async move {
            debug!(%kind, "auto-send firing");
            (kind, self.send_identifier(kind, identifier).await)
        });
        join_all(sends).await
    }

    /// Earliest pending auto-send deadline, if any.
    pub fn next_due(&self) -> Option<Timestamp> {
        self.lock()
            .values()
            .filter_map(|c| c.auto_send.pending().map(|p| p.due_at))
            .min()
    }

    /// Poll pending auto-sends every `tick` until the handle is aborted.
    pub fn spawn_auto_sender(self: Arc<Self>, tick: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                interval.tick().await;
                for (kind, result) in self.fire_due().await {
                    if let Err(e) = result {
                        warn!(%kind, error = %e, "auto-send failed");
                    }
                }
            }
        })
    }

    pub fn is_verified(&self, kind: IdentifierKind) -> bool {
        self.channel(kind, |c| c.verified.is_some())
    }

    /// The identifier that was proven for `kind`.
    pub fn verified_identifier(&self, kind: IdentifierKind) -> Option<Identifier> {
        self.channel(kind, |c| c.verified.clone())
    }

    /// Whether the manual "resend code" control should be offered.
    pub fn can_resend(&self, kind: IdentifierKind) -> bool {
        let now = self.clock.now();
        self.channel(kind, |c| !c.in_flight && !c.resend_locked(now))
    }

    /// Seconds left in the current window for display.
    pub fn countdown(&self, kind: IdentifierKind) -> u64 {
        let now = self.clock.now();
        self.channel(kind, |c| {
            c.session
                .as_ref()
                .map(|s| s.remaining_secs(now))
                .unwrap_or(0)
        })
    }

    pub fn status(&self, kind: IdentifierKind) -> ChannelStatus {
        let now = self.clock.now();
        self.channel(kind, |c| ChannelStatus {
            kind,
            verified: c.verified.is_some(),
            session_live: c.has_live_session(now),
            send_in_flight: c.in_flight,
            auto_send_pending: c.auto_send.pending().is_some(),
            resend_in_secs: if c.resend_locked(now) {
                c.session.as_ref().map(|s| s.remaining_secs(now)).unwrap_or(0)
            } else {
                0
            },
        })
    }

    /// Restore a verification recorded in persisted wizard state.
    pub fn restore_verified(&self, kind: IdentifierKind, identifier: Identifier) {
        self.channel(kind, |c| c.verified = Some(identifier));
    }
}
