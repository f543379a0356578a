//! Nullable backend: records every call and answers from in-memory state.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use loanflow_client::{Backend, ClientError, OtpIssued, VideoReceipt};
use loanflow_types::{
    ApplicantCoreFields, ApplicationReference, DocumentVerification, DraftId, Identifier,
    IdentifierKind, OtpCode, SessionToken, SubmissionPayload, VideoArtifact,
};

struct IssuedCode {
    kind: IdentifierKind,
    code: String,
    /// Cleared when a newer code is issued for the same kind.
    current: bool,
}

#[derive(Default)]
struct State {
    next_id: u64,
    codes: HashMap<String, IssuedCode>,
    otp_sends: Vec<(IdentifierKind, String)>,
    otp_verifies: usize,
    drafts: Vec<(DraftId, ApplicantCoreFields)>,
    draft_updates: Vec<(DraftId, ApplicantCoreFields)>,
    uploads: Vec<(DraftId, usize)>,
    documents: HashMap<String, DocumentVerification>,
    lookups: Vec<String>,
    submissions: Vec<SubmissionPayload>,
    fail_otp_send: bool,
    fail_otp_verify: bool,
    fail_create_draft: bool,
    fail_update_draft: bool,
    fail_upload: bool,
    fail_lookups: bool,
    fail_submit: bool,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

fn take(flag: &mut bool) -> bool {
    std::mem::replace(flag, false)
}

fn unavailable(what: &str) -> ClientError {
    ClientError::Transport(format!("null backend: {what} failed"))
}

/// A test backend.
///
/// Passcodes are deterministic per send and retrievable with
/// [`NullBackend::code_for`]. Each `fail_next_*` toggle fails exactly one
/// call of that kind.
#[derive(Default)]
pub struct NullBackend {
    state: Mutex<State>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The code the backend "sent" for `token`, if it issued it.
    pub fn code_for(&self, token: &SessionToken) -> Option<String> {
        self.state().codes.get(token.as_str()).map(|c| c.code.clone())
    }

    pub fn otp_sends(&self) -> usize {
        self.state().otp_sends.len()
    }

    /// Every identifier a code was sent to, in order, as wire values.
    pub fn otp_sent_to(&self) -> Vec<(IdentifierKind, String)> {
        self.state().otp_sends.clone()
    }

    pub fn otp_verifies(&self) -> usize {
        self.state().otp_verifies
    }

    pub fn drafts_created(&self) -> usize {
        self.state().drafts.len()
    }

    pub fn draft_updates(&self) -> usize {
        self.state().draft_updates.len()
    }

    pub fn last_draft_fields(&self) -> Option<ApplicantCoreFields> {
        let state = self.state();
        state
            .draft_updates
            .last()
            .or(state.drafts.last())
            .map(|(_, fields)| fields.clone())
    }

    /// Byte lengths of every successful upload.
    pub fn uploads(&self) -> Vec<(DraftId, usize)> {
        self.state().uploads.clone()
    }

    /// Lookups made, as `ref:<id>` or `app:<application>/<org>`.
    pub fn digilocker_lookups(&self) -> Vec<String> {
        self.state().lookups.clone()
    }

    pub fn submissions(&self) -> Vec<SubmissionPayload> {
        self.state().submissions.clone()
    }

    /// Register the document returned for `reference_id` (and for any
    /// application lookup that passes it).
    pub fn set_document(&self, reference_id: &str, document: DocumentVerification) {
        self.state()
            .documents
            .insert(reference_id.to_string(), document);
    }

    pub fn fail_next_otp_send(&self) {
        self.state().fail_otp_send = true;
    }

    pub fn fail_next_otp_verify(&self) {
        self.state().fail_otp_verify = true;
    }

    pub fn fail_next_create_draft(&self) {
        self.state().fail_create_draft = true;
    }

    pub fn fail_next_update_draft(&self) {
        self.state().fail_update_draft = true;
    }

    pub fn fail_next_upload(&self) {
        self.state().fail_upload = true;
    }

    pub fn fail_next_submit(&self) {
        self.state().fail_submit = true;
    }

    /// Unlike the one-shot toggles, this stays set until turned off.
    pub fn fail_digilocker_lookups(&self, fail: bool) {
        self.state().fail_lookups = fail;
    }
}

#[async_trait]
impl Backend for NullBackend {
    async fn send_otp(
        &self,
        kind: IdentifierKind,
        identifier: &Identifier,
    ) -> Result<OtpIssued, ClientError> {
        let mut state = self.state();
        if take(&mut state.fail_otp_send) {
            return Err(unavailable("send_otp"));
        }
        let id = state.next_id();
        for issued in state.codes.values_mut().filter(|c| c.kind == kind) {
            issued.current = false;
        }
        let token = format!("null-otp-{id}");
        state.codes.insert(
            token.clone(),
            IssuedCode {
                kind,
                code: format!("{:06}", (id * 7919 + 104_729) % 1_000_000),
                current: true,
            },
        );
        state.otp_sends.push((kind, identifier.wire_value()));
        Ok(OtpIssued {
            session_token: SessionToken::new(token),
        })
    }

    async fn verify_otp(&self, token: &SessionToken, code: &OtpCode) -> Result<bool, ClientError> {
        let mut state = self.state();
        if take(&mut state.fail_otp_verify) {
            return Err(unavailable("verify_otp"));
        }
        state.otp_verifies += 1;
        Ok(state
            .codes
            .get(token.as_str())
            .is_some_and(|c| c.current && c.code == code.as_str()))
    }

    async fn create_draft(
        &self,
        fields: &ApplicantCoreFields,
        _phone_verified: bool,
        _email_verified: bool,
    ) -> Result<DraftId, ClientError> {
        let mut state = self.state();
        if take(&mut state.fail_create_draft) {
            return Err(unavailable("create_draft"));
        }
        let id = DraftId::new(format!("draft-{}", state.next_id()));
        state.drafts.push((id.clone(), fields.clone()));
        Ok(id)
    }

    async fn update_draft(
        &self,
        id: &DraftId,
        fields: &ApplicantCoreFields,
    ) -> Result<(), ClientError> {
        let mut state = self.state();
        if take(&mut state.fail_update_draft) {
            return Err(unavailable("update_draft"));
        }
        if !state.drafts.iter().any(|(d, _)| d == id) {
            return Err(ClientError::Status(404));
        }
        state.draft_updates.push((id.clone(), fields.clone()));
        Ok(())
    }

    async fn upload_video(
        &self,
        draft_id: &DraftId,
        video: &VideoArtifact,
    ) -> Result<VideoReceipt, ClientError> {
        let mut state = self.state();
        if take(&mut state.fail_upload) {
            return Err(unavailable("upload_video"));
        }
        state.uploads.push((draft_id.clone(), video.len()));
        let n = state.uploads.len();
        Ok(VideoReceipt {
            reference: format!("video-{draft_id}-{n}"),
        })
    }

    async fn fetch_digilocker_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<DocumentVerification, ClientError> {
        let mut state = self.state();
        state.lookups.push(format!("ref:{reference_id}"));
        if state.fail_lookups {
            return Err(unavailable("digilocker lookup"));
        }
        state
            .documents
            .get(reference_id)
            .cloned()
            .ok_or(ClientError::Status(404))
    }

    async fn fetch_digilocker_for_application(
        &self,
        application_id: &str,
        org_id: &str,
        reference_id: Option<&str>,
    ) -> Result<DocumentVerification, ClientError> {
        let mut state = self.state();
        state.lookups.push(format!("app:{application_id}/{org_id}"));
        if state.fail_lookups {
            return Err(unavailable("digilocker lookup"));
        }
        reference_id
            .and_then(|id| state.documents.get(id).cloned())
            .or_else(|| state.documents.values().next().cloned())
            .ok_or(ClientError::Status(404))
    }

    async fn submit_application(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<ApplicationReference, ClientError> {
        let mut state = self.state();
        if take(&mut state.fail_submit) {
            return Err(unavailable("submit_application"));
        }
        state.submissions.push(payload.clone());
        let id = state.next_id();
        Ok(ApplicationReference::new(format!("APP-{id:06}")))
    }
}
