use std::fmt;

use loanflow_capture::{GeolocationError, RecorderError};
use loanflow_client::ClientError;
use loanflow_handoff::HandoffError;
use loanflow_types::{ApplicationReference, ValidationError};
use loanflow_verification::VerificationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Something the wizard needs before an action is allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    ContactDetails,
    PhoneVerified,
    EmailVerified,
    SecondaryEmailVerified,
    LocationCaptured,
    ConsentsGranted,
    DraftCreated,
    VideoUploaded,
    VideoConfirmed,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ContactDetails => "contact details",
            Self::PhoneVerified => "verified phone",
            Self::EmailVerified => "verified email",
            Self::SecondaryEmailVerified => "verified secondary email",
            Self::LocationCaptured => "location",
            Self::ConsentsGranted => "all consents",
            Self::DraftCreated => "draft application",
            Self::VideoUploaded => "uploaded video",
            Self::VideoConfirmed => "video confirmation",
        };
        f.write_str(s)
    }
}

fn list(missing: &[Requirement]) -> String {
    missing
        .iter()
        .map(Requirement::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Geolocation(#[from] GeolocationError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error(transparent)]
    Handoff(#[from] HandoffError),

    #[error("network error: {0}")]
    Network(String),

    #[error("cannot {action}: missing {}", list(.missing))]
    Precondition {
        action: &'static str,
        missing: Vec<Requirement>,
    },

    #[error("application already submitted ({0})")]
    AlreadySubmitted(ApplicationReference),
}

impl From<ClientError> for WizardError {
    fn from(e: ClientError) -> Self {
        WizardError::Network(e.to_string())
    }
}

impl WizardError {
    pub fn precondition(action: &'static str, missing: Vec<Requirement>) -> Self {
        WizardError::Precondition { action, missing }
    }
}
