//! Application records: the provisional draft, consents, and the final
//! submission payload.

use crate::document::DocumentVerification;
use crate::error::ValidationError;
use crate::identifier::{EmailAddress, PhoneNumber};
use crate::location::GeolocationFix;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a provisional application record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(String);

impl DraftId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Core fields collected on the contact step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplicantCoreFields {
    pub full_name: String,
    pub phone: PhoneNumber,
    pub email: EmailAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_email: Option<EmailAddress>,
    /// Requested loan amount in whole rupees.
    pub requested_amount: u64,
    pub tenure_months: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
}

impl ApplicantCoreFields {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.full_name.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "full_name" });
        }
        if self.requested_amount == 0 {
            return Err(ValidationError::InvalidField {
                field: "requested_amount",
                reason: "must be greater than zero".into(),
            });
        }
        if self.tenure_months == 0 {
            return Err(ValidationError::InvalidField {
                field: "tenure_months",
                reason: "must be at least one month".into(),
            });
        }
        Ok(())
    }
}

/// Lifecycle of a provisional record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
    Submitted,
}

/// A provisional application created before the video step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub id: DraftId,
    pub fields: ApplicantCoreFields,
    pub phone_verified: bool,
    pub email_verified: bool,
    pub status: DraftStatus,
    pub created_at: Timestamp,
}

/// Applicant consents, all required before submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSet {
    pub income_declaration: bool,
    pub terms_accepted: bool,
    pub kyc_data_consent: bool,
}

impl ConsentSet {
    pub fn all_granted(&self) -> bool {
        self.income_declaration && self.terms_accepted && self.kyc_data_consent
    }

    pub fn granted() -> Self {
        Self {
            income_declaration: true,
            terms_accepted: true,
            kyc_data_consent: true,
        }
    }
}

/// Durable reference returned by the backend after submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationReference(String);

impl ApplicationReference {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The one atomic request that turns a draft into a submitted application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub draft_id: DraftId,
    pub fields: ApplicantCoreFields,
    pub phone_verified: bool,
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentVerification>,
    pub location: GeolocationFix,
    pub consents: ConsentSet,
    /// Backend reference of the uploaded video.
    pub video_reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> ApplicantCoreFields {
        ApplicantCoreFields {
            full_name: "Asha Rao".into(),
            phone: PhoneNumber::parse("9876543210").unwrap(),
            email: EmailAddress::parse("asha@example.com").unwrap(),
            secondary_email: None,
            requested_amount: 250_000,
            tenure_months: 24,
            referral_code: None,
        }
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut f = fields();
        f.full_name = "   ".into();
        assert_eq!(
            f.validate(),
            Err(ValidationError::MissingField { field: "full_name" })
        );
    }

    #[test]
    fn zero_amount_is_rejected() {
        let mut f = fields();
        f.requested_amount = 0;
        assert!(f.validate().is_err());
        assert!(fields().validate().is_ok());
    }

    #[test]
    fn consents_require_every_flag() {
        assert!(ConsentSet::granted().all_granted());
        let partial = ConsentSet {
            kyc_data_consent: false,
            ..ConsentSet::granted()
        };
        assert!(!partial.all_granted());
    }
}
