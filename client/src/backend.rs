//! The backend seam.

use async_trait::async_trait;
use loanflow_types::{
    ApplicantCoreFields, ApplicationReference, DocumentVerification, DraftId, Identifier,
    IdentifierKind, OtpCode, SessionToken, SubmissionPayload, VideoArtifact,
};

use crate::error::ClientError;

/// Result of a successful passcode send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtpIssued {
    pub session_token: SessionToken,
}

/// Result of a successful video upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoReceipt {
    /// Backend reference to the stored video, carried into the submission.
    pub reference: String,
}

/// Every backend call the applicant flow makes.
///
/// Issuing a new passcode for an identifier kind invalidates the previous
/// token for that kind on the backend side.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn send_otp(
        &self,
        kind: IdentifierKind,
        identifier: &Identifier,
    ) -> Result<OtpIssued, ClientError>;

    /// `Ok(false)` means the code did not match.
    async fn verify_otp(&self, token: &SessionToken, code: &OtpCode) -> Result<bool, ClientError>;

    async fn create_draft(
        &self,
        fields: &ApplicantCoreFields,
        phone_verified: bool,
        email_verified: bool,
    ) -> Result<DraftId, ClientError>;

    async fn update_draft(
        &self,
        id: &DraftId,
        fields: &ApplicantCoreFields,
    ) -> Result<(), ClientError>;

    async fn upload_video(
        &self,
        draft_id: &DraftId,
        video: &VideoArtifact,
    ) -> Result<VideoReceipt, ClientError>;

    /// Cross-domain lookup keyed only by the provider reference id.
    async fn fetch_digilocker_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<DocumentVerification, ClientError>;

    /// Authenticated lookup scoped to a known application.
    async fn fetch_digilocker_for_application(
        &self,
        application_id: &str,
        org_id: &str,
        reference_id: Option<&str>,
    ) -> Result<DocumentVerification, ClientError>;

    async fn submit_application(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<ApplicationReference, ClientError>;
}
