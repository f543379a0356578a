//! Completion endpoint: turn the provider's redirect back into verified data
//! and a next destination.

use std::sync::Arc;
use std::time::Duration;

use loanflow_client::Backend;
use loanflow_types::{Clock, DocumentVerification, FlowParams};
use tracing::{info, warn};
use url::Url;

use crate::cache::ViewCache;
use crate::context::{CompletionParams, HandoffContext, ProviderStatus};
use crate::countdown::AutoAdvance;
use crate::error::HandoffError;
use crate::id::HandoffId;
use crate::resolve::{outbound_url, resolve, CompletionPlan};
use crate::storage::{context_key, load_json, store_json, verified_data_key, RecoverableStorage};

/// Where the public flow sends the applicant next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicRedirect {
    pub location: Url,
    pub success: bool,
    /// A payload was stored but the provider details could not be fetched.
    pub placeholder: bool,
    /// Id the payload is stored under; `None` when nothing was stored.
    pub payload: Option<HandoffId>,
}

#[derive(Debug)]
pub struct InternalCompletion {
    pub application_id: String,
    pub document: DocumentVerification,
    pub detail_path: String,
    pub auto_advance: AutoAdvance,
}

#[derive(Debug)]
pub enum CompletionOutcome {
    Public(PublicRedirect),
    Internal(InternalCompletion),
}

pub fn application_detail_path(application_id: &str) -> String {
    format!("/applications/{application_id}")
}

fn mock_document(reference_id: Option<String>) -> DocumentVerification {
    DocumentVerification {
        reference_id,
        name: "Mock Applicant".into(),
        masked_aadhaar: Some("XXXX-XXXX-1234".into()),
        date_of_birth: Some("1990-01-01".into()),
        gender: Some("U".into()),
        address: Some("Mock address".into()),
        placeholder: false,
    }
}

/// Consume the verified payload stored for `handoff_id`. A second call
/// returns `None`.
pub fn take_verified_data(
    storage: &dyn RecoverableStorage,
    handoff_id: &HandoffId,
) -> Result<Option<DocumentVerification>, HandoffError> {
    let key = verified_data_key(handoff_id);
    let data = load_json(storage, &key)?;
    if data.is_some() {
        storage.remove(&key)?;
    }
    Ok(data)
}

pub struct HandoffCompletion {
    backend: Arc<dyn Backend>,
    storage: Arc<dyn RecoverableStorage>,
    cache: Arc<dyn ViewCache>,
    clock: Arc<dyn Clock>,
    auto_advance: Duration,
}

impl HandoffCompletion {
    pub fn new(
        backend: Arc<dyn Backend>,
        storage: Arc<dyn RecoverableStorage>,
        cache: Arc<dyn ViewCache>,
        clock: Arc<dyn Clock>,
        params: &FlowParams,
    ) -> Self {
        Self {
            backend,
            storage,
            cache,
            clock,
            auto_advance: Duration::from_secs(params.auto_advance_secs),
        }
    }

    pub fn storage(&self) -> &dyn RecoverableStorage {
        self.storage.as_ref()
    }

    /// The context saved for `handoff_id`. An unreadable one is treated as
    /// absent.
    fn stored_context(&self, handoff_id: &HandoffId) -> Option<HandoffContext> {
        match load_json(self.storage.as_ref(), &context_key(handoff_id)) {
            Ok(context) => context,
            Err(e) => {
                warn!(%handoff_id, error = %e, "ignoring unreadable handoff context");
                None
            }
        }
    }

    /// Best effort: the applicant is sent on even if storage misbehaves.
    fn discard(&self, key: &str) {
        if let Err(e) = self.storage.remove(key) {
            warn!(key, error = %e, "failed to clear stored handoff state");
        }
    }

    pub fn plan(&self, params: &CompletionParams) -> Result<CompletionPlan, HandoffError> {
        let stored = params
            .handoff_id
            .as_ref()
            .and_then(|id| self.stored_context(id));
        resolve(params, stored.as_ref(), self.clock.now())
    }

    /// Resolve the caller and run the matching completion path.
    pub async fn complete(
        &self,
        params: &CompletionParams,
    ) -> Result<CompletionOutcome, HandoffError> {
        let plan = self.plan(params)?;
        self.run(plan).await
    }

    /// Run an already resolved plan.
    pub async fn run(&self, plan: CompletionPlan) -> Result<CompletionOutcome, HandoffError> {
        match plan {
            plan @ CompletionPlan::Public { .. } => {
                self.complete_public(plan).await.map(CompletionOutcome::Public)
            }
            plan @ CompletionPlan::Internal { .. } => self
                .complete_internal(plan)
                .await
                .map(CompletionOutcome::Internal),
        }
    }

    pub async fn complete_public(
        &self,
        plan: CompletionPlan,
    ) -> Result<PublicRedirect, HandoffError> {
        let CompletionPlan::Public {
            handoff_id,
            return_url,
            reference_id,
            status,
            mock,
            ..
        } = plan
        else {
            return Err(HandoffError::Parse("expected a public completion".into()));
        };

        let (document, success) = if status == Some(ProviderStatus::Failure) {
            info!(?reference_id, "provider reported failure");
            (None, false)
        } else if mock {
            (Some(mock_document(reference_id)), true)
        } else if let Some(id) = reference_id.as_deref() {
            match self.backend.fetch_digilocker_by_reference(id).await {
                Ok(document) => (Some(document), true),
                Err(e) => {
                    warn!(reference_id = id, error = %e, "provider lookup failed; continuing with pending details");
                    (Some(DocumentVerification::pending_details(reference_id.clone())), true)
                }
            }
        } else {
            warn!("completion without a reference id; continuing with pending details");
            (Some(DocumentVerification::pending_details(None)), true)
        };

        // Without an id from the request the payload gets a fresh one; the
        // destination learns it from the outbound URL.
        let handoff_id = handoff_id.unwrap_or_else(HandoffId::new);
        let data_key = verified_data_key(&handoff_id);
        let placeholder = document.as_ref().is_some_and(|d| d.placeholder);
        let payload = match &document {
            Some(document) => match store_json(self.storage.as_ref(), &data_key, document) {
                Ok(()) => Some(handoff_id.clone()),
                Err(e) => {
                    warn!(%handoff_id, error = %e, "could not store verified data; redirecting without it");
                    None
                }
            },
            None => {
                self.discard(&data_key);
                None
            }
        };
        self.discard(&context_key(&handoff_id));

        let location = outbound_url(&return_url, success, payload.as_ref());
        info!(%location, success, placeholder, "public handoff complete");
        Ok(PublicRedirect {
            location,
            success,
            placeholder: placeholder && payload.is_some(),
            payload,
        })
    }

    pub async fn complete_internal(
        &self,
        plan: CompletionPlan,
    ) -> Result<InternalCompletion, HandoffError> {
        let CompletionPlan::Internal {
            handoff_id,
            application_id,
            org_id,
            reference_id,
            status,
        } = plan
        else {
            return Err(HandoffError::Parse("expected an internal completion".into()));
        };

        if let Some(id) = &handoff_id {
            self.discard(&context_key(id));
        }
        if status == Some(ProviderStatus::Failure) {
            return Err(HandoffError::Lookup(format!(
                "provider reported failure for application {application_id}"
            )));
        }

        let document = self
            .backend
            .fetch_digilocker_for_application(&application_id, &org_id, reference_id.as_deref())
            .await
            .map_err(|e| HandoffError::Lookup(e.to_string()))?;

        self.cache.invalidate(&application_id);
        let detail_path = application_detail_path(&application_id);
        info!(%application_id, %org_id, "internal handoff complete");
        Ok(InternalCompletion {
            application_id,
            document,
            auto_advance: AutoAdvance::arm(detail_path.clone(), self.auto_advance),
            detail_path,
        })
    }
}
