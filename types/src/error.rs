//! Local validation failures, raised before any network call is made.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("phone number must contain exactly 10 digits: {0:?}")]
    InvalidPhone(String),

    #[error("email address is not well-formed: {0:?}")]
    InvalidEmail(String),

    #[error("passcode must be exactly 6 digits")]
    MalformedCode,

    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}
