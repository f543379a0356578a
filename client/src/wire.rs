//! Request and response bodies exchanged with the backend.

use loanflow_types::{ApplicantCoreFields, DocumentVerification, IdentifierKind};
use serde::{Deserialize, Serialize};

// ── Passcodes ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SendOtpRequest<'a> {
    pub identifier: &'a str,
    #[serde(rename = "identifierKind")]
    pub identifier_kind: IdentifierKind,
}

#[derive(Debug, Deserialize)]
pub struct SendOtpResponse {
    #[serde(rename = "sessionToken")]
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpRequest<'a> {
    #[serde(rename = "sessionToken")]
    pub session_token: &'a str,
    pub code: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpResponse {
    #[serde(default)]
    pub verified: bool,
}

// ── Drafts ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreateDraftRequest<'a> {
    #[serde(flatten)]
    pub fields: &'a ApplicantCoreFields,
    pub phone_verified: bool,
    pub email_verified: bool,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CreateDraftResponse {
    pub id: String,
}

// ── Video ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VideoUploadResponse {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default, rename = "videoUrl")]
    pub video_url: Option<String>,
}

// ── DigiLocker ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DigilockerLookupResponse {
    pub data: DocumentVerification,
}

// ── Submission ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    #[serde(rename = "applicationId")]
    pub application_id: String,
}
