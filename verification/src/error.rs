use thiserror::Error;

/// Failures of a send or verify. A malformed identifier or a send already in
/// flight is not an error; see [`crate::SkipReason`].
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("passcode must be exactly 6 digits")]
    Malformed,

    #[error("passcode session expired or unknown, request a new code")]
    SessionExpired,

    #[error("incorrect passcode")]
    InvalidCode,

    #[error("network error: {0}")]
    Network(String),
}

impl From<loanflow_client::ClientError> for VerificationError {
    fn from(e: loanflow_client::ClientError) -> Self {
        VerificationError::Network(e.to_string())
    }
}
