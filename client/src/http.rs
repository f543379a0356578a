//! `reqwest` implementation of [`Backend`].

use std::time::Duration;

use async_trait::async_trait;
use loanflow_types::{
    ApplicantCoreFields, ApplicationReference, DocumentVerification, DraftId, Identifier,
    IdentifierKind, OtpCode, SessionToken, SubmissionPayload, VideoArtifact,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::backend::{Backend, OtpIssued, VideoReceipt};
use crate::error::ClientError;
use crate::wire::{
    CreateDraftRequest, CreateDraftResponse, DigilockerLookupResponse, SendOtpRequest,
    SendOtpResponse, SubmitResponse, VerifyOtpRequest, VerifyOtpResponse, VideoUploadResponse,
};

/// HTTP client for the hosted backend.
///
/// Wraps `reqwest::Client` with the backend's base URL and provides typed
/// methods for each call the flow needs.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a client targeting the given base URL (e.g. `https://api.example.com/`).
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url).map_err(|e| ClientError::Url(e.to_string()))?;
        // Url::join drops the last segment unless the path ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Url(e.to_string()))
    }

    /// `path` followed by `id` as one percent-encoded segment, so an id can
    /// never climb out of its collection or smuggle in a query.
    fn resource(&self, path: &str, id: &str) -> Result<Url, ClientError> {
        if id.is_empty() || id == "." || id == ".." {
            return Err(ClientError::Url(format!("invalid resource id {id:?}")));
        }
        let mut url = self.endpoint(path)?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Url(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }
}

/// Turn a backend response into `T`: non-2xx and `{ "error": ... }` are failures.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let json: serde_json::Value = match response.json().await {
        Ok(json) => json,
        Err(_) if !status.is_success() => return Err(ClientError::Status(status.as_u16())),
        Err(e) => return Err(ClientError::Decode(e.to_string())),
    };

    if let Some(err) = json.get("error").filter(|e| !e.is_null()) {
        let message = err
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(ClientError::Backend(message));
    }
    if !status.is_success() {
        return Err(ClientError::Status(status.as_u16()));
    }

    serde_json::from_value(json).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send_otp(
        &self,
        kind: IdentifierKind,
        identifier: &Identifier,
    ) -> Result<OtpIssued, ClientError> {
        let wire_value = identifier.wire_value();
        let response = self
            .http
            .post(self.endpoint("otp/send")?)
            .json(&SendOtpRequest {
                identifier: &wire_value,
                identifier_kind: kind,
            })
            .send()
            .await?;
        let body: SendOtpResponse = read_json(response).await?;
        debug!(%kind, "passcode issued");
        Ok(OtpIssued {
            session_token: SessionToken::new(body.session_token),
        })
    }

    async fn verify_otp(&self, token: &SessionToken, code: &OtpCode) -> Result<bool, ClientError> {
        let response = self
            .http
            .post(self.endpoint("otp/verify")?)
            .json(&VerifyOtpRequest {
                session_token: token.as_str(),
                code: code.as_str(),
            })
            .send()
            .await?;
        let body: VerifyOtpResponse = read_json(response).await?;
        Ok(body.verified)
    }

    async fn create_draft(
        &self,
        fields: &ApplicantCoreFields,
        phone_verified: bool,
        email_verified: bool,
    ) -> Result<DraftId, ClientError> {
        let response = self
            .http
            .post(self.endpoint("applications/drafts")?)
            .json(&CreateDraftRequest {
                fields,
                phone_verified,
                email_verified,
                status: "draft",
            })
            .send()
            .await?;
        let body: CreateDraftResponse = read_json(response).await?;
        Ok(DraftId::new(body.id))
    }

    async fn update_draft(
        &self,
        id: &DraftId,
        fields: &ApplicantCoreFields,
    ) -> Result<(), ClientError> {
        let url = self.resource("applications/drafts", id.as_str())?;
        let response = self.http.patch(url).json(fields).send().await?;
        let _: serde_json::Value = read_json(response).await?;
        Ok(())
    }

    async fn upload_video(
        &self,
        draft_id: &DraftId,
        video: &VideoArtifact,
    ) -> Result<VideoReceipt, ClientError> {
        let part = reqwest::multipart::Part::bytes(video.bytes.clone())
            .file_name(format!("kyc-{}.webm", draft_id.as_str()))
            .mime_str(video.mime_type)
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("token", draft_id.as_str().to_string())
            .part("video", part);

        let response = self
            .http
            .post(self.endpoint("kyc/video")?)
            .multipart(form)
            .send()
            .await?;
        let body: VideoUploadResponse = read_json(response).await?;
        let reference = body
            .reference
            .or(body.video_url)
            .unwrap_or_else(|| draft_id.as_str().to_string());
        debug!(draft_id = %draft_id, bytes = video.len(), "video uploaded");
        Ok(VideoReceipt { reference })
    }

    async fn fetch_digilocker_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<DocumentVerification, ClientError> {
        let mut url = self.endpoint("digilocker/reference")?;
        url.query_pairs_mut().append_pair("id", reference_id);
        let response = self.http.get(url).send().await?;
        let body: DigilockerLookupResponse = read_json(response).await?;
        Ok(body.data)
    }

    async fn fetch_digilocker_for_application(
        &self,
        application_id: &str,
        org_id: &str,
        reference_id: Option<&str>,
    ) -> Result<DocumentVerification, ClientError> {
        let mut url = self.resource("digilocker/applications", application_id)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("orgId", org_id);
            if let Some(id) = reference_id {
                query.append_pair("id", id);
            }
        }
        let response = self.http.get(url).send().await?;
        let body: DigilockerLookupResponse = read_json(response).await?;
        Ok(body.data)
    }

    async fn submit_application(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<ApplicationReference, ClientError> {
        let response = self
            .http
            .post(self.endpoint("applications/submit")?)
            .json(payload)
            .send()
            .await?;
        let body: SubmitResponse = read_json(response).await.map_err(|e| {
            warn!(draft_id = %payload.draft_id, error = %e, "submission rejected");
            e
        })?;
        Ok(ApplicationReference::new(body.application_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let backend = HttpBackend::new("https://api.example.com/v1").unwrap();
        assert_eq!(backend.base_url().as_str(), "https://api.example.com/v1/");
        assert_eq!(
            backend.endpoint("otp/send").unwrap().as_str(),
            "https://api.example.com/v1/otp/send"
        );
    }

    #[test]
    fn resource_ids_stay_inside_their_collection() {
        let backend = HttpBackend::new("https://api.example.com/v1/").unwrap();
        let url = backend
            .resource("digilocker/applications", "../../admin/users?x=")
            .unwrap();
        assert_eq!(url.host_str(), Some("api.example.com"));
        assert!(url.path().starts_with("/v1/digilocker/applications/"));
        assert_eq!(url.path_segments().unwrap().count(), 4);
        assert_eq!(url.query(), None);

        let plain = backend.resource("applications/drafts", "draft-7").unwrap();
        assert_eq!(plain.as_str(), "https://api.example.com/v1/applications/drafts/draft-7");
    }

    #[test]
    fn dot_segments_are_not_resource_ids() {
        let backend = HttpBackend::new("https://api.example.com/v1/").unwrap();
        for id in ["", ".", ".."] {
            assert!(matches!(
                backend.resource("digilocker/applications", id),
                Err(ClientError::Url(_))
            ));
        }
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpBackend::new("not a url"),
            Err(ClientError::Url(_))
        ));
    }
}
