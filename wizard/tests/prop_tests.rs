use loanflow_types::{
    ApplicantCoreFields, ApplicationDraft, ConsentSet, DraftId, DraftStatus, EmailAddress,
    GeolocationFix, PhoneNumber, Timestamp,
};
use loanflow_wizard::{Preconditions, Requirement, SubmissionFinalizer, WizardError, WizardSession};
use proptest::prelude::*;

fn ready_session() -> WizardSession {
    let fields = ApplicantCoreFields {
        full_name: "Ravi Kumar".into(),
        phone: PhoneNumber::parse("9000000001").unwrap(),
        email: EmailAddress::parse("ravi@example.in").unwrap(),
        secondary_email: None,
        requested_amount: 50_000,
        tenure_months: 12,
        referral_code: None,
    };
    WizardSession {
        draft: Some(ApplicationDraft {
            id: DraftId::new("draft-1"),
            fields: fields.clone(),
            phone_verified: true,
            email_verified: true,
            status: DraftStatus::Draft,
            created_at: Timestamp::from_secs(1),
        }),
        fields: Some(fields),
        phone_verified: true,
        email_verified: true,
        location: Some(GeolocationFix {
            latitude: 12.97,
            longitude: 77.59,
            accuracy: 20.0,
            captured_at: Timestamp::from_secs(2),
        }),
        consents: ConsentSet::granted(),
        video_reference: Some("video-1".into()),
        video_confirmed: true,
        ..WizardSession::default()
    }
}

#[test]
fn unverified_secondary_email_is_never_submittable() {
    let mut session = ready_session();
    if let Some(fields) = session.fields.as_mut() {
        fields.secondary_email = Some(EmailAddress::parse("ravi.work@example.in").unwrap());
    }
    assert_eq!(
        Preconditions::evaluate(&session).missing(),
        vec![Requirement::SecondaryEmailVerified]
    );
    assert!(SubmissionFinalizer::payload(&session).is_err());

    session.secondary_email_verified = true;
    assert!(SubmissionFinalizer::payload(&session).is_ok());
}

#[test]
fn fully_prepared_session_is_submittable() {
    let session = ready_session();
    assert!(Preconditions::evaluate(&session).all_hold());
    assert!(SubmissionFinalizer::payload(&session).is_ok());
}

proptest! {
    /// Clearing any combination of requirements blocks submission, and the
    /// missing list names exactly the cleared ones.
    #[test]
    fn any_cleared_requirement_blocks_submit(
        phone in any::<bool>(),
        email in any::<bool>(),
        income in any::<bool>(),
        terms in any::<bool>(),
        kyc in any::<bool>(),
        location in any::<bool>(),
        video in any::<bool>(),
        confirmed in any::<bool>(),
        has_secondary in any::<bool>(),
        secondary in any::<bool>(),
    ) {
        let mut session = ready_session();
        if has_secondary {
            if let Some(fields) = session.fields.as_mut() {
                fields.secondary_email = Some(EmailAddress::parse("ravi.work@example.in").unwrap());
            }
        }
        session.secondary_email_verified = secondary;
        session.phone_verified = phone;
        session.email_verified = email;
        session.consents = ConsentSet {
            income_declaration: income,
            terms_accepted: terms,
            kyc_data_consent: kyc,
        };
        if !location {
            session.location = None;
        }
        if !video {
            session.video_reference = None;
        }
        session.video_confirmed = confirmed;

        let secondary_ok = !has_secondary || secondary;
        let all = phone
            && email
            && secondary_ok
            && income
            && terms
            && kyc
            && location
            && video
            && confirmed;
        let preconditions = Preconditions::evaluate(&session);
        prop_assert_eq!(preconditions.all_hold(), all);

        let missing = preconditions.missing();
        prop_assert_eq!(missing.contains(&Requirement::PhoneVerified), !phone);
        prop_assert_eq!(missing.contains(&Requirement::EmailVerified), !email);
        prop_assert_eq!(
            missing.contains(&Requirement::SecondaryEmailVerified),
            !secondary_ok
        );
        prop_assert_eq!(missing.contains(&Requirement::ConsentsGranted), !(income && terms && kyc));
        prop_assert_eq!(missing.contains(&Requirement::LocationCaptured), !location);
        prop_assert_eq!(missing.contains(&Requirement::VideoUploaded), !video);
        prop_assert_eq!(missing.contains(&Requirement::VideoConfirmed), !confirmed);

        match SubmissionFinalizer::payload(&session) {
            Ok(payload) => {
                prop_assert!(all);
                prop_assert!(payload.phone_verified && payload.email_verified);
                prop_assert!(payload.consents.all_granted());
            }
            Err(WizardError::Precondition { missing: reported, .. }) => {
                prop_assert!(!all);
                prop_assert_eq!(reported, missing);
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }
}
