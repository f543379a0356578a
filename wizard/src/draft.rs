//! Provisional application records.
//!
//! The draft exists so the video upload has a durable foreign key before
//! anything is submitted. Callers never create a second draft for the same
//! wizard session: [`DraftApplicationService::create_draft`] returns the
//! stored id when there is one.

use std::sync::Arc;

use loanflow_client::Backend;
use loanflow_types::{ApplicantCoreFields, ApplicationDraft, Clock, DraftId, DraftStatus};
use tracing::{debug, info};

use crate::error::{Requirement, WizardError};
use crate::session::WizardSession;

pub struct DraftApplicationService {
    backend: Arc<dyn Backend>,
    clock: Arc<dyn Clock>,
}

impl DraftApplicationService {
    pub fn new(backend: Arc<dyn Backend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Create the draft for this session, or return the one it already has.
    pub async fn create_draft(
        &self,
        fields: &ApplicantCoreFields,
        session: &mut WizardSession,
    ) -> Result<DraftId, WizardError> {
        if let Some(id) = session.draft_id() {
            debug!(draft_id = %id, "reusing existing draft");
            return Ok(id.clone());
        }

        let mut missing = Vec::new();
        if !session.phone_verified {
            missing.push(Requirement::PhoneVerified);
        }
        if !session.email_verified {
            missing.push(Requirement::EmailVerified);
        }
        if !missing.is_empty() {
            return Err(WizardError::precondition("create draft", missing));
        }
        fields.validate()?;

        let id = self
            .backend
            .create_draft(fields, session.phone_verified, session.email_verified)
            .await?;
        info!(draft_id = %id, "draft created");
        session.draft = Some(ApplicationDraft {
            id: id.clone(),
            fields: fields.clone(),
            phone_verified: session.phone_verified,
            email_verified: session.email_verified,
            status: DraftStatus::Draft,
            created_at: self.clock.now(),
        });
        Ok(id)
    }

    /// Push edited fields to an existing draft.
    pub async fn update_draft(
        &self,
        id: &DraftId,
        fields: &ApplicantCoreFields,
        session: &mut WizardSession,
    ) -> Result<(), WizardError> {
        fields.validate()?;
        self.backend.update_draft(id, fields).await?;
        if let Some(draft) = session.draft.as_mut().filter(|d| &d.id == id) {
            draft.fields = fields.clone();
        }
        debug!(draft_id = %id, "draft updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loanflow_nullables::{NullBackend, NullClock};
    use loanflow_types::{EmailAddress, PhoneNumber};

    fn fields() -> ApplicantCoreFields {
        ApplicantCoreFields {
            full_name: "Meera Nair".into(),
            phone: PhoneNumber::parse("9811122233").unwrap(),
            email: EmailAddress::parse("meera@example.com").unwrap(),
            secondary_email: None,
            requested_amount: 75_000,
            tenure_months: 18,
            referral_code: None,
        }
    }

    fn verified_session() -> WizardSession {
        WizardSession {
            phone_verified: true,
            email_verified: true,
            ..WizardSession::default()
        }
    }

    #[tokio::test]
    async fn second_create_reuses_the_stored_id() {
        let backend = Arc::new(NullBackend::new());
        let service = DraftApplicationService::new(backend.clone(), Arc::new(NullClock::new(42)));
        let mut session = verified_session();

        let first = service.create_draft(&fields(), &mut session).await.unwrap();
        let second = service.create_draft(&fields(), &mut session).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.drafts_created(), 1);
        let draft = session.draft.as_ref().unwrap();
        assert_eq!(draft.status, DraftStatus::Draft);
        assert_eq!(draft.created_at.as_millis(), 42);
    }

    #[tokio::test]
    async fn failed_create_leaves_no_draft() {
        let backend = Arc::new(NullBackend::new());
        let service = DraftApplicationService::new(backend.clone(), Arc::new(NullClock::new(0)));
        let mut session = verified_session();

        backend.fail_next_create_draft();
        let result = service.create_draft(&fields(), &mut session).await;
        assert!(matches!(result, Err(WizardError::Network(_))));
        assert!(session.draft.is_none());

        service.create_draft(&fields(), &mut session).await.unwrap();
        assert_eq!(backend.drafts_created(), 1);
    }

    #[tokio::test]
    async fn update_pushes_fields_to_the_draft() {
        let backend = Arc::new(NullBackend::new());
        let service = DraftApplicationService::new(backend.clone(), Arc::new(NullClock::new(0)));
        let mut session = verified_session();
        let id = service.create_draft(&fields(), &mut session).await.unwrap();

        let mut edited = fields();
        edited.requested_amount = 90_000;
        service.update_draft(&id, &edited, &mut session).await.unwrap();
        assert_eq!(backend.draft_updates(), 1);
        assert_eq!(session.draft.unwrap().fields.requested_amount, 90_000);
    }
}
