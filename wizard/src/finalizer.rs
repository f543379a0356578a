//! Final submission.

use std::sync::Arc;

use loanflow_client::Backend;
use loanflow_types::{ApplicationReference, DraftStatus, SubmissionPayload};
use tracing::{info, warn};

use crate::controller::Step;
use crate::error::{Requirement, WizardError};
use crate::session::WizardSession;

/// Which submission requirements currently hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Preconditions {
    pub contact_details: bool,
    pub phone_verified: bool,
    pub email_verified: bool,
    /// Holds trivially when no secondary email was given.
    pub secondary_email_verified: bool,
    pub consents_granted: bool,
    pub location_present: bool,
    pub draft_present: bool,
    pub video_uploaded: bool,
    pub video_confirmed: bool,
}

impl Preconditions {
    pub fn evaluate(session: &WizardSession) -> Self {
        Self {
            contact_details: session.fields.is_some(),
            phone_verified: session.phone_verified,
            email_verified: session.email_verified,
            secondary_email_verified: session
                .fields
                .as_ref()
                .map_or(true, |f| f.secondary_email.is_none())
                || session.secondary_email_verified,
            consents_granted: session.consents.all_granted(),
            location_present: session.location.is_some(),
            draft_present: session.draft.is_some(),
            video_uploaded: session.video_reference.is_some(),
            video_confirmed: session.video_confirmed,
        }
    }

    pub fn missing(&self) -> Vec<Requirement> {
        [
            (self.contact_details, Requirement::ContactDetails),
            (self.phone_verified, Requirement::PhoneVerified),
            (self.email_verified, Requirement::EmailVerified),
            (
                self.secondary_email_verified,
                Requirement::SecondaryEmailVerified,
            ),
            (self.consents_granted, Requirement::ConsentsGranted),
            (self.location_present, Requirement::LocationCaptured),
            (self.draft_present, Requirement::DraftCreated),
            (self.video_uploaded, Requirement::VideoUploaded),
            (self.video_confirmed, Requirement::VideoConfirmed),
        ]
        .into_iter()
        .filter_map(|(ok, requirement)| (!ok).then_some(requirement))
        .collect()
    }

    pub fn all_hold(&self) -> bool {
        self.missing().is_empty()
    }
}

pub struct SubmissionFinalizer {
    backend: Arc<dyn Backend>,
}

impl SubmissionFinalizer {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Assemble the payload from `session`, or report what is missing.
    pub fn payload(session: &WizardSession) -> Result<SubmissionPayload, WizardError> {
        let missing = Preconditions::evaluate(session).missing();
        let (Some(fields), Some(location), Some(draft), Some(video_reference), true) = (
            session.fields.as_ref(),
            session.location,
            session.draft.as_ref(),
            session.video_reference.as_ref(),
            missing.is_empty(),
        ) else {
            return Err(WizardError::precondition("submit", missing));
        };

        Ok(SubmissionPayload {
            draft_id: draft.id.clone(),
            fields: fields.clone(),
            phone_verified: session.phone_verified,
            email_verified: session.email_verified,
            document: session.document.clone(),
            location,
            consents: session.consents,
            video_reference: video_reference.clone(),
        })
    }

    /// Submit once. On failure only `video_confirmed` is reset; every other
    /// piece of durable state is left for the retry.
    pub async fn submit(
        &self,
        session: &mut WizardSession,
    ) -> Result<ApplicationReference, WizardError> {
        if let Some(reference) = &session.submitted {
            return Err(WizardError::AlreadySubmitted(reference.clone()));
        }
        let payload = Self::payload(session)?;

        match self.backend.submit_application(&payload).await {
            Ok(reference) => {
                info!(draft_id = %payload.draft_id, %reference, "application submitted");
                if let Some(draft) = session.draft.as_mut() {
                    draft.status = DraftStatus::Submitted;
                }
                session.submitted = Some(reference.clone());
                session.step = Step::Submitted;
                Ok(reference)
            }
            Err(e) => {
                warn!(draft_id = %payload.draft_id, error = %e, "submission failed");
                session.video_confirmed = false;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use loanflow_types::{ApplicantCoreFields, EmailAddress, PhoneNumber};

    use super::*;

    #[test]
    fn empty_session_misses_everything() {
        let missing = Preconditions::evaluate(&WizardSession::default()).missing();
        assert_eq!(missing.len(), 8);
        assert_eq!(missing[0], Requirement::ContactDetails);
    }

    #[test]
    fn payload_refused_with_missing_list() {
        let session = WizardSession {
            phone_verified: true,
            email_verified: true,
            ..WizardSession::default()
        };
        match SubmissionFinalizer::payload(&session) {
            Err(WizardError::Precondition { action, missing }) => {
                assert_eq!(action, "submit");
                assert!(!missing.contains(&Requirement::PhoneVerified));
                assert!(missing.contains(&Requirement::LocationCaptured));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unverified_secondary_email_blocks_the_payload() {
        let mut session = WizardSession {
            phone_verified: true,
            email_verified: true,
            ..WizardSession::default()
        };
        assert!(Preconditions::evaluate(&session).secondary_email_verified);

        session.fields = Some(ApplicantCoreFields {
            full_name: "Asha Rao".into(),
            phone: PhoneNumber::parse("9876543210").unwrap(),
            email: EmailAddress::parse("asha@example.com").unwrap(),
            secondary_email: Some(EmailAddress::parse("asha.work@example.com").unwrap()),
            requested_amount: 100_000,
            tenure_months: 12,
            referral_code: None,
        });
        let missing = Preconditions::evaluate(&session).missing();
        assert!(missing.contains(&Requirement::SecondaryEmailVerified));

        session.secondary_email_verified = true;
        let missing = Preconditions::evaluate(&session).missing();
        assert!(!missing.contains(&Requirement::SecondaryEmailVerified));
    }
}
