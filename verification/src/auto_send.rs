//! Debounced auto-send driven by identifier edits.
//!
//! An edit either schedules a send (replacing any earlier pending one) or
//! cancels it. The send fires only once its debounce deadline passes with no
//! further edits, and never for the value most recently sent.

use loanflow_types::{Identifier, Timestamp};

/// Why an edit did not schedule a send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The value is not yet a well-formed identifier.
    Incomplete,
    /// A session for this kind is still live.
    SessionActive,
    /// This kind is already verified.
    AlreadyVerified,
    /// A send was already issued for exactly this value.
    AlreadySent,
    /// A send for this kind is in flight.
    InFlight,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AutoSendDecision {
    Scheduled { due_at: Timestamp },
    Skipped(SkipReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingSend {
    pub identifier: Identifier,
    pub due_at: Timestamp,
}

/// Per-channel "last value triggered" guard plus the cancellable pending send.
#[derive(Debug, Default)]
pub struct AutoSendGuard {
    last_sent: Option<Identifier>,
    pending: Option<PendingSend>,
}

impl AutoSendGuard {
    /// Record an edit. `blocked` carries a channel-level reason to skip
    /// (live session, verified, in flight) computed by the caller.
    pub fn on_change(
        &mut self,
        identifier: Option<Identifier>,
        blocked: Option<SkipReason>,
        now: Timestamp,
        debounce_ms: u64,
    ) -> AutoSendDecision {
        // Any edit supersedes whatever was pending.
        self.pending = None;

        let Some(identifier) = identifier else {
            return AutoSendDecision::Skipped(SkipReason::Incomplete);
        };
        if let Some(reason) = blocked {
            return AutoSendDecision::Skipped(reason);
        }
        if self.last_sent.as_ref() == Some(&identifier) {
            return AutoSendDecision::Skipped(SkipReason::AlreadySent);
        }

        let due_at = now.plus_millis(debounce_ms);
        self.pending = Some(PendingSend { identifier, due_at });
        AutoSendDecision::Scheduled { due_at }
    }

    /// Remove and return the pending send if its deadline has passed.
    pub fn take_due(&mut self, now: Timestamp) -> Option<Identifier> {
        match &self.pending {
            Some(p) if now >= p.due_at => self.pending.take().map(|p| p.identifier),
            _ => None,
        }
    }

    pub fn record_sent(&mut self, identifier: Identifier) {
        self.last_sent = Some(identifier);
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<&PendingSend> {
        self.pending.as_ref()
    }

    pub fn last_sent(&self) -> Option<&Identifier> {
        self.last_sent.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loanflow_types::PhoneNumber;

    fn phone(raw: &str) -> Identifier {
        Identifier::Phone(PhoneNumber::parse(raw).unwrap())
    }

    const DEBOUNCE: u64 = 500;

    #[test]
    fn schedules_after_debounce() {
        let mut guard = AutoSendGuard::default();
        let decision = guard.on_change(
            Some(phone("9876543210")),
            None,
            Timestamp::from_millis(1_000),
            DEBOUNCE,
        );
        assert_eq!(
            decision,
            AutoSendDecision::Scheduled {
                due_at: Timestamp::from_millis(1_500)
            }
        );
        assert_eq!(guard.take_due(Timestamp::from_millis(1_499)), None);
        assert_eq!(
            guard.take_due(Timestamp::from_millis(1_500)),
            Some(phone("9876543210"))
        );
        assert!(guard.pending().is_none());
    }

    #[test]
    fn edit_before_firing_replaces_pending() {
        let mut guard = AutoSendGuard::default();
        guard.on_change(Some(phone("9876543210")), None, Timestamp::from_millis(0), DEBOUNCE);
        guard.on_change(Some(phone("9876543211")), None, Timestamp::from_millis(300), DEBOUNCE);
        // The first deadline passes without firing the superseded value.
        assert_eq!(guard.take_due(Timestamp::from_millis(600)), None);
        assert_eq!(
            guard.take_due(Timestamp::from_millis(800)),
            Some(phone("9876543211"))
        );
    }

    #[test]
    fn edit_to_incomplete_cancels_pending() {
        let mut guard = AutoSendGuard::default();
        guard.on_change(Some(phone("9876543210")), None, Timestamp::from_millis(0), DEBOUNCE);
        let decision = guard.on_change(None, None, Timestamp::from_millis(100), DEBOUNCE);
        assert_eq!(decision, AutoSendDecision::Skipped(SkipReason::Incomplete));
        assert_eq!(guard.take_due(Timestamp::from_millis(10_000)), None);
    }

    #[test]
    fn same_value_as_last_sent_is_skipped() {
        let mut guard = AutoSendGuard::default();
        guard.record_sent(phone("9876543210"));
        let decision = guard.on_change(
            Some(phone("98765 43210")),
            None,
            Timestamp::from_millis(0),
            DEBOUNCE,
        );
        assert_eq!(decision, AutoSendDecision::Skipped(SkipReason::AlreadySent));
    }

    #[test]
    fn channel_block_wins() {
        let mut guard = AutoSendGuard::default();
        let decision = guard.on_change(
            Some(phone("9876543210")),
            Some(SkipReason::SessionActive),
            Timestamp::from_millis(0),
            DEBOUNCE,
        );
        assert_eq!(decision, AutoSendDecision::Skipped(SkipReason::SessionActive));
        assert!(guard.pending().is_none());
    }
}
