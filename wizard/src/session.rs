//! Wizard state that must survive a reload.

use std::sync::Arc;

use loanflow_handoff::{load_json, store_json, HandoffId, RecoverableStorage};
use loanflow_types::{
    ApplicantCoreFields, ApplicationDraft, ApplicationReference, ConsentSet, DocumentVerification,
    DraftId, GeolocationFix,
};
use serde::{Deserialize, Serialize};

use crate::controller::Step;
use crate::error::WizardError;

pub const WIZARD_SESSION_KEY: &str = "loanflow_wizard_session";

/// Durable slice of the wizard. Each async operation writes only its own
/// fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardSession {
    pub step: Step,
    pub fields: Option<ApplicantCoreFields>,
    pub phone_verified: bool,
    pub email_verified: bool,
    pub secondary_email_verified: bool,
    pub location: Option<GeolocationFix>,
    pub consents: ConsentSet,
    pub document: Option<DocumentVerification>,
    /// Handoff started from this session and not yet picked up.
    pub pending_handoff: Option<HandoffId>,
    pub draft: Option<ApplicationDraft>,
    pub video_reference: Option<String>,
    /// Applicant confirmed the uploaded clip. The only field a failed
    /// submission resets.
    pub video_confirmed: bool,
    pub submitted: Option<ApplicationReference>,
}

impl WizardSession {
    pub fn draft_id(&self) -> Option<&DraftId> {
        self.draft.as_ref().map(|d| &d.id)
    }
}

/// Loads and saves the [`WizardSession`] through recoverable storage.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn RecoverableStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn RecoverableStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn RecoverableStorage> {
        &self.storage
    }

    /// A missing session starts fresh.
    pub fn load(&self) -> Result<WizardSession, WizardError> {
        Ok(load_json(self.storage.as_ref(), WIZARD_SESSION_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, session: &WizardSession) -> Result<(), WizardError> {
        store_json(self.storage.as_ref(), WIZARD_SESSION_KEY, session)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), WizardError> {
        self.storage.remove(WIZARD_SESSION_KEY)?;
        Ok(())
    }
}
