//! One-time passcode verification of applicant contact details.
//!
//! Each identifier kind (phone, email, secondary email) runs its own
//! independent session:
//! 1. **Send**: a well-formed identifier is submitted and the backend returns a
//!    session token valid for a fixed window.
//! 2. **Verify**: the six-digit code is checked once; success consumes the
//!    session and marks the kind verified.
//!
//! Sends can also be triggered by field edits through a debounced auto-send
//! guard that never re-sends the value it last sent.

pub mod auto_send;
pub mod error;
pub mod manager;
pub mod session;

pub use auto_send::{AutoSendDecision, AutoSendGuard, SkipReason};
pub use error::VerificationError;
pub use manager::{SendOutcome, VerificationSessionManager};
pub use session::{ChannelStatus, VerificationSession};
