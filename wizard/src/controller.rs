//! Step sequencing for the applicant wizard.
//!
//! ```text
//! Contact → Verification → Location → Consent → Identity → VideoKyc → Review → Submitted
//! ```
//!
//! `advance` checks the gate of the current step; `back` never discards
//! durable state. Entering `VideoKyc` creates (or reuses) the draft so the
//! upload has something to attach to. Leaving `VideoKyc` in either
//! direction releases the camera.

use std::fmt;
use std::sync::Arc;

use loanflow_capture::{
    GeolocationCapture, GeolocationError, Geolocator, MediaDevice, PositionOptions,
    VideoCaptureRecorder,
};
use loanflow_client::Backend;
use loanflow_handoff::{
    landing_handoff_id, take_verified_data, FlowMarker, HandoffContext, RecoverableStorage,
};
use loanflow_types::{
    ApplicantCoreFields, ApplicationReference, Clock, ConsentSet, DocumentVerification,
    FlowParams, GeolocationFix, Identifier, IdentifierKind,
};
use loanflow_verification::{AutoSendDecision, SendOutcome, VerificationSessionManager};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::draft::DraftApplicationService;
use crate::error::{Requirement, WizardError};
use crate::finalizer::{Preconditions, SubmissionFinalizer};
use crate::session::{SessionStore, WizardSession};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Contact,
    Verification,
    Location,
    Consent,
    /// DigiLocker document verification. Optional: the applicant may advance
    /// without it and the submission simply carries no document.
    Identity,
    VideoKyc,
    Review,
    Submitted,
}

impl Step {
    pub const ALL: [Step; 8] = [
        Self::Contact,
        Self::Verification,
        Self::Location,
        Self::Consent,
        Self::Identity,
        Self::VideoKyc,
        Self::Review,
        Self::Submitted,
    ];

    pub fn next(self) -> Option<Step> {
        let i = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(i + 1).copied()
    }

    /// `None` at the first step and once submitted.
    pub fn prev(self) -> Option<Step> {
        if self == Self::Submitted {
            return None;
        }
        let i = Self::ALL.iter().position(|s| *s == self)?;
        i.checked_sub(1).map(|i| Self::ALL[i])
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Contact => "contact",
            Self::Verification => "verification",
            Self::Location => "location",
            Self::Consent => "consent",
            Self::Identity => "identity",
            Self::VideoKyc => "video_kyc",
            Self::Review => "review",
            Self::Submitted => "submitted",
        };
        f.write_str(s)
    }
}

/// External collaborators of the wizard.
pub struct FlowDeps {
    pub backend: Arc<dyn Backend>,
    pub clock: Arc<dyn Clock>,
    pub geolocator: Arc<dyn Geolocator>,
    pub media: Arc<dyn MediaDevice>,
    pub storage: Arc<dyn RecoverableStorage>,
}

pub struct StepController {
    params: FlowParams,
    clock: Arc<dyn Clock>,
    store: SessionStore,
    verification: Arc<VerificationSessionManager>,
    location: GeolocationCapture,
    recorder: VideoCaptureRecorder,
    drafts: DraftApplicationService,
    finalizer: SubmissionFinalizer,
    session: WizardSession,
}

impl StepController {
    /// Build the wizard, resuming any persisted session.
    pub fn new(deps: FlowDeps, params: FlowParams) -> Result<Self, WizardError> {
        let store = SessionStore::new(deps.storage);
        let session = store.load()?;

        let verification = Arc::new(VerificationSessionManager::new(
            deps.backend.clone(),
            deps.clock.clone(),
            &params,
        ));
        if let Some(fields) = &session.fields {
            if session.phone_verified {
                verification
                    .restore_verified(IdentifierKind::Phone, Identifier::Phone(fields.phone.clone()));
            }
            if session.email_verified {
                verification
                    .restore_verified(IdentifierKind::Email, Identifier::Email(fields.email.clone()));
            }
            if let (true, Some(secondary)) =
                (session.secondary_email_verified, &fields.secondary_email)
            {
                verification.restore_verified(
                    IdentifierKind::SecondaryEmail,
                    Identifier::Email(secondary.clone()),
                );
            }
        }
        if session.step != Step::Contact {
            info!(step = %session.step, draft = ?session.draft_id(), "resuming wizard session");
        }

        Ok(Self {
            location: GeolocationCapture::new(deps.geolocator, PositionOptions::from_params(&params)),
            recorder: VideoCaptureRecorder::new(
                deps.media,
                deps.backend.clone(),
                deps.clock.clone(),
                &params,
            ),
            drafts: DraftApplicationService::new(deps.backend.clone(), deps.clock.clone()),
            finalizer: SubmissionFinalizer::new(deps.backend),
            clock: deps.clock,
            params,
            store,
            verification,
            session,
        })
    }

    pub fn step(&self) -> Step {
        self.session.step
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    /// Shared handle, e.g. for [`VerificationSessionManager::spawn_auto_sender`].
    pub fn verification(&self) -> &Arc<VerificationSessionManager> {
        &self.verification
    }

    pub fn location(&self) -> &GeolocationCapture {
        &self.location
    }

    pub fn recorder(&self) -> &VideoCaptureRecorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut VideoCaptureRecorder {
        &mut self.recorder
    }

    fn persist(&self) -> Result<(), WizardError> {
        self.store.save(&self.session)
    }

    /// Copy verification results from the session manager into durable state.
    fn sync_verification(&mut self) {
        self.session.phone_verified = self.verification.is_verified(IdentifierKind::Phone);
        self.session.email_verified = self.verification.is_verified(IdentifierKind::Email);
        let has_secondary = self
            .session
            .fields
            .as_ref()
            .is_some_and(|f| f.secondary_email.is_some());
        self.session.secondary_email_verified =
            has_secondary && self.verification.is_verified(IdentifierKind::SecondaryEmail);
    }

    fn raw_identifier(&self, kind: IdentifierKind) -> Result<String, WizardError> {
        let fields = self
            .session
            .fields
            .as_ref()
            .ok_or_else(|| WizardError::precondition("send code", vec![Requirement::ContactDetails]))?;
        match kind {
            IdentifierKind::Phone => Ok(fields.phone.as_str().to_string()),
            IdentifierKind::Email => Ok(fields.email.as_str().to_string()),
            IdentifierKind::SecondaryEmail => fields
                .secondary_email
                .as_ref()
                .map(|e| e.as_str().to_string())
                .ok_or_else(|| {
                    WizardError::precondition("send code", vec![Requirement::ContactDetails])
                }),
        }
    }

    /// Record the contact step. Identifier edits feed the auto-send guard;
    /// editing a verified identifier withdraws its verification and sends a
    /// wizard that was already past `Verification` back there.
    pub async fn set_contact(
        &mut self,
        fields: ApplicantCoreFields,
    ) -> Result<Vec<(IdentifierKind, AutoSendDecision)>, WizardError> {
        fields.validate()?;
        let mut decisions = vec![
            (
                IdentifierKind::Phone,
                self.verification
                    .on_identifier_changed(IdentifierKind::Phone, fields.phone.as_str()),
            ),
            (
                IdentifierKind::Email,
                self.verification
                    .on_identifier_changed(IdentifierKind::Email, fields.email.as_str()),
            ),
        ];
        if let Some(secondary) = &fields.secondary_email {
            decisions.push((
                IdentifierKind::SecondaryEmail,
                self.verification
                    .on_identifier_changed(IdentifierKind::SecondaryEmail, secondary.as_str()),
            ));
        }

        if let Some(id) = self.session.draft_id().cloned() {
            if self.session.submitted.is_none() {
                self.drafts
                    .update_draft(&id, &fields, &mut self.session)
                    .await?;
            }
        }
        self.session.fields = Some(fields);
        self.sync_verification();
        let from = self.session.step;
        if Self::past_verification(from) && !self.verification_missing().is_empty() {
            if from == Step::VideoKyc {
                self.recorder.cancel();
            }
            self.session.step = Step::Verification;
            info!(%from, to = %Step::Verification, "contact changed, verification required again");
        }
        self.persist()?;
        Ok(decisions)
    }

    pub async fn send_code(&mut self, kind: IdentifierKind) -> Result<SendOutcome, WizardError> {
        let raw = self.raw_identifier(kind)?;
        Ok(self.verification.send(kind, &raw).await?)
    }

    /// Manual resend; refused while the previous code's window is open.
    pub async fn resend_code(&mut self, kind: IdentifierKind) -> Result<SendOutcome, WizardError> {
        let raw = self.raw_identifier(kind)?;
        Ok(self.verification.resend(kind, &raw).await?)
    }

    pub async fn verify_code(&mut self, kind: IdentifierKind, code: &str) -> Result<(), WizardError> {
        let result = self.verification.verify(kind, code).await;
        self.sync_verification();
        self.persist()?;
        Ok(result?)
    }

    fn store_location(
        &mut self,
        result: Result<GeolocationFix, GeolocationError>,
    ) -> Result<GeolocationFix, WizardError> {
        let fix = result?;
        self.session.location = Some(fix);
        self.persist()?;
        Ok(fix)
    }

    pub async fn capture_location(&mut self) -> Result<GeolocationFix, WizardError> {
        let result = self.location.capture().await;
        self.store_location(result)
    }

    /// Safe to tap repeatedly; an earlier denial does not block success.
    pub async fn retry_location(&mut self) -> Result<GeolocationFix, WizardError> {
        let result = self.location.retry().await;
        self.store_location(result)
    }

    pub fn set_consents(&mut self, consents: ConsentSet) -> Result<(), WizardError> {
        self.session.consents = consents;
        self.persist()
    }

    /// Persist the handoff context and return the URL to give the provider as
    /// its redirect target.
    pub fn begin_identity(
        &mut self,
        return_url: &Url,
        completion_endpoint: &Url,
    ) -> Result<Url, WizardError> {
        let start = HandoffContext::begin(
            self.store.storage().as_ref(),
            FlowMarker::PublicReferral,
            return_url,
            completion_endpoint,
            self.clock.now(),
            self.params.handoff_ttl_secs,
        )?;
        self.session.pending_handoff = Some(start.handoff_id);
        self.persist()?;
        Ok(start.redirect_target)
    }

    /// Pick up verified data left by the completion endpoint, once. The
    /// handoff named on `landing` wins over the one this session started.
    pub fn resume_from_identity(
        &mut self,
        landing: Option<&Url>,
    ) -> Result<Option<DocumentVerification>, WizardError> {
        let Some(handoff_id) = landing
            .and_then(landing_handoff_id)
            .or_else(|| self.session.pending_handoff.clone())
        else {
            return Ok(None);
        };
        let Some(document) = take_verified_data(self.store.storage().as_ref(), &handoff_id)? else {
            return Ok(None);
        };
        if document.placeholder {
            warn!("document verified with details pending");
        }
        self.session.document = Some(document.clone());
        self.session.pending_handoff = None;
        self.persist()?;
        Ok(Some(document))
    }

    /// Upload the stopped recording against the session's draft.
    pub async fn upload_video(&mut self) -> Result<String, WizardError> {
        let draft_id = self
            .session
            .draft_id()
            .cloned()
            .ok_or_else(|| WizardError::precondition("upload video", vec![Requirement::DraftCreated]))?;
        let receipt = self.recorder.upload(&draft_id).await?;
        self.session.video_reference = Some(receipt.reference.clone());
        self.session.video_confirmed = false;
        self.persist()?;
        Ok(receipt.reference)
    }

    /// The applicant's confirmation of the uploaded clip.
    pub fn confirm_video(&mut self, confirmed: bool) -> Result<(), WizardError> {
        if confirmed && self.session.video_reference.is_none() {
            return Err(WizardError::precondition(
                "confirm video",
                vec![Requirement::VideoUploaded],
            ));
        }
        self.session.video_confirmed = confirmed;
        self.persist()
    }

    pub fn preconditions(&self) -> Preconditions {
        Preconditions::evaluate(&self.session)
    }

    pub fn submit_enabled(&self) -> bool {
        self.session.submitted.is_none() && self.preconditions().all_hold()
    }

    fn verification_missing(&self) -> Vec<Requirement> {
        let s = &self.session;
        let mut missing = Vec::new();
        if !s.phone_verified {
            missing.push(Requirement::PhoneVerified);
        }
        if !s.email_verified {
            missing.push(Requirement::EmailVerified);
        }
        let has_secondary = s
            .fields
            .as_ref()
            .is_some_and(|f| f.secondary_email.is_some());
        if has_secondary && !s.secondary_email_verified {
            missing.push(Requirement::SecondaryEmailVerified);
        }
        missing
    }

    fn past_verification(step: Step) -> bool {
        matches!(
            step,
            Step::Location | Step::Consent | Step::Identity | Step::VideoKyc | Step::Review
        )
    }

    /// What the current step still needs before `advance` succeeds.
    pub fn step_missing(&self) -> Vec<Requirement> {
        let s = &self.session;
        let mut missing = Vec::new();
        match s.step {
            Step::Contact => {
                if s.fields.is_none() {
                    missing.push(Requirement::ContactDetails);
                }
            }
            Step::Verification => missing = self.verification_missing(),
            Step::Location => {
                if s.location.is_none() {
                    missing.push(Requirement::LocationCaptured);
                }
            }
            Step::Consent => {
                if !s.consents.all_granted() {
                    missing.push(Requirement::ConsentsGranted);
                }
            }
            Step::Identity => {}
            Step::VideoKyc => {
                if s.video_reference.is_none() {
                    missing.push(Requirement::VideoUploaded);
                }
            }
            Step::Review | Step::Submitted => {}
        }
        missing
    }

    /// Move forward if the current step's gate holds. From `Review` this is
    /// the submit action.
    pub async fn advance(&mut self) -> Result<Step, WizardError> {
        if let Some(reference) = &self.session.submitted {
            return Err(WizardError::AlreadySubmitted(reference.clone()));
        }
        match self.session.step {
            Step::Submitted => return Ok(Step::Submitted),
            Step::Review => {
                self.submit().await?;
                return Ok(self.session.step);
            }
            _ => {}
        }

        let missing = self.step_missing();
        if !missing.is_empty() {
            return Err(WizardError::precondition("advance", missing));
        }
        let from = self.session.step;
        let Some(to) = from.next() else {
            return Ok(from);
        };

        if to == Step::VideoKyc {
            self.enter_video_kyc().await?;
        }
        if from == Step::VideoKyc {
            self.recorder.cancel();
        }
        self.session.step = to;
        self.persist()?;
        info!(%from, %to, "wizard advanced");
        Ok(to)
    }

    async fn enter_video_kyc(&mut self) -> Result<(), WizardError> {
        let fields = self.session.fields.clone().ok_or_else(|| {
            WizardError::precondition("create draft", vec![Requirement::ContactDetails])
        })?;
        let result = self.drafts.create_draft(&fields, &mut self.session).await;
        // A created draft is durable even if a later step fails.
        self.persist()?;
        result.map(|_| ())
    }

    /// Step back without discarding anything already recorded.
    pub fn back(&mut self) -> Result<Step, WizardError> {
        let from = self.session.step;
        let Some(to) = from.prev() else {
            return Ok(from);
        };
        if from == Step::VideoKyc {
            self.recorder.cancel();
        }
        self.session.step = to;
        self.persist()?;
        debug!(%from, %to, "wizard moved back");
        Ok(to)
    }

    pub async fn submit(&mut self) -> Result<ApplicationReference, WizardError> {
        let result = self.finalizer.submit(&mut self.session).await;
        self.persist()?;
        result
    }
}
