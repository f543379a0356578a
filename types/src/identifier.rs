//! Contact identifiers proven by one-time passcodes.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Country prefix prepended to every phone number sent to the backend.
pub const PHONE_COUNTRY_PREFIX: &str = "+91";

/// Number of digits in a national phone number.
pub const PHONE_DIGITS: usize = 10;

/// Number of digits in a one-time passcode.
pub const OTP_DIGITS: usize = 6;

/// Which contact channel a passcode session proves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    Phone,
    Email,
    SecondaryEmail,
}

impl IdentifierKind {
    pub const ALL: [IdentifierKind; 3] = [Self::Phone, Self::Email, Self::SecondaryEmail];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Email => "email",
            Self::SecondaryEmail => "secondary_email",
        }
    }

    pub fn is_email(&self) -> bool {
        matches!(self, Self::Email | Self::SecondaryEmail)
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A national phone number of exactly ten digits.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse user input, tolerating separators and a leading country prefix.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();
        let national = cleaned
            .strip_prefix(PHONE_COUNTRY_PREFIX)
            .or_else(|| {
                (cleaned.len() == PHONE_DIGITS + 2)
                    .then(|| cleaned.strip_prefix("91"))
                    .flatten()
            })
            .or_else(|| {
                (cleaned.len() == PHONE_DIGITS + 1)
                    .then(|| cleaned.strip_prefix('0'))
                    .flatten()
            })
            .unwrap_or(&cleaned);

        if national.len() == PHONE_DIGITS && national.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(national.to_string()))
        } else {
            Err(ValidationError::InvalidPhone(raw.to_string()))
        }
    }

    /// The ten national digits.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// International form sent to the passcode backend.
    pub fn normalized(&self) -> String {
        format!("{PHONE_COUNTRY_PREFIX}{}", self.0)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn email_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    })
}

/// An email address in `local@domain.tld` shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if email_pattern().is_match(trimmed) {
            Ok(Self(trimmed.to_ascii_lowercase()))
        } else {
            Err(ValidationError::InvalidEmail(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated identifier of either channel type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    Phone(PhoneNumber),
    Email(EmailAddress),
}

impl Identifier {
    /// Validate `raw` according to the format `kind` requires.
    pub fn parse(kind: IdentifierKind, raw: &str) -> Result<Self, ValidationError> {
        match kind {
            IdentifierKind::Phone => PhoneNumber::parse(raw).map(Self::Phone),
            IdentifierKind::Email | IdentifierKind::SecondaryEmail => {
                EmailAddress::parse(raw).map(Self::Email)
            }
        }
    }

    /// The string sent over the wire.
    pub fn wire_value(&self) -> String {
        match self {
            Self::Phone(p) => p.normalized(),
            Self::Email(e) => e.as_str().to_string(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phone(p) => p.fmt(f),
            Self::Email(e) => e.fmt(f),
        }
    }
}

/// A six-digit one-time passcode as typed by the applicant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpCode(String);

impl OtpCode {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.len() == OTP_DIGITS && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ValidationError::MalformedCode)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Codes never show up in logs.
impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

/// Opaque backend-issued handle for one passcode session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_accepts_separators_and_prefix() {
        assert_eq!(PhoneNumber::parse("98765 43210").unwrap().as_str(), "9876543210");
        assert_eq!(PhoneNumber::parse("+91 98765-43210").unwrap().as_str(), "9876543210");
        assert_eq!(PhoneNumber::parse("919876543210").unwrap().as_str(), "9876543210");
        assert_eq!(PhoneNumber::parse("09876543210").unwrap().as_str(), "9876543210");
    }

    #[test]
    fn phone_rejects_short_and_alpha() {
        assert!(PhoneNumber::parse("987654321").is_err());
        assert!(PhoneNumber::parse("98765432ab").is_err());
        assert!(PhoneNumber::parse("").is_err());
    }

    #[test]
    fn phone_normalizes_with_country_prefix() {
        let phone = PhoneNumber::parse("9876543210").unwrap();
        assert_eq!(phone.normalized(), "+919876543210");
    }

    #[test]
    fn email_shape() {
        assert!(EmailAddress::parse("a.b@example.co.in").is_ok());
        assert!(EmailAddress::parse("user@example").is_err());
        assert!(EmailAddress::parse("user @example.com").is_err());
        assert!(EmailAddress::parse("user@@example.com").is_err());
        assert!(EmailAddress::parse("user@.com").is_err());
    }

    #[test]
    fn otp_requires_six_digits() {
        assert!(OtpCode::parse("123456").is_ok());
        assert_eq!(OtpCode::parse("12345"), Err(ValidationError::MalformedCode));
        assert_eq!(OtpCode::parse("1234567"), Err(ValidationError::MalformedCode));
        assert_eq!(OtpCode::parse("12a456"), Err(ValidationError::MalformedCode));
    }

    #[test]
    fn otp_debug_is_redacted() {
        let code = OtpCode::parse("424242").unwrap();
        assert!(!format!("{code:?}").contains("424242"));
    }
}
