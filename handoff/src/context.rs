//! The handoff protocol object and the parameters it crosses the redirect with.
//!
//! Phase one ([`HandoffContext::begin`]) runs before leaving for the provider:
//! it builds the completion URL the provider will send the applicant back to
//! and persists a same-origin copy of the context. Phase two runs on the
//! completion endpoint, which only sees [`CompletionParams`] and whatever
//! storage survived.

use loanflow_types::Timestamp;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::HandoffError;
use crate::id::HandoffId;
use crate::storage::{context_key, store_json, RecoverableStorage};

pub const PARAM_HANDOFF_ID: &str = "handoff";
pub const PARAM_REFERENCE_ID: &str = "id";
pub const PARAM_STATUS: &str = "status";
pub const PARAM_RETURN_URL: &str = "returnUrl";
pub const PARAM_MOCK: &str = "mock";
pub const PARAM_APPLICATION_ID: &str = "applicationId";
pub const PARAM_ORG_ID: &str = "orgId";

/// Which surface started the verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum FlowMarker {
    /// Public referral application, possibly on another origin.
    PublicReferral,
    /// Authenticated staff view of an existing application.
    InternalApplication {
        application_id: String,
        org_id: String,
    },
}

/// Recoverable context persisted before the redirect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffContext {
    pub handoff_id: HandoffId,
    pub return_url: String,
    #[serde(flatten)]
    pub flow: FlowMarker,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

/// A begun handoff: its id and the completion URL to give the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandoffStart {
    pub handoff_id: HandoffId,
    pub redirect_target: Url,
}

impl HandoffContext {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Persist the context under a fresh [`HandoffId`] and build the
    /// completion URL the provider redirects back to.
    pub fn begin(
        storage: &dyn RecoverableStorage,
        flow: FlowMarker,
        return_url: &Url,
        completion_endpoint: &Url,
        now: Timestamp,
        ttl_secs: u64,
    ) -> Result<HandoffStart, HandoffError> {
        let context = HandoffContext {
            handoff_id: HandoffId::new(),
            return_url: return_url.to_string(),
            flow,
            created_at: now,
            expires_at: now.plus_millis(ttl_secs * 1000),
        };
        store_json(storage, &context_key(&context.handoff_id), &context)?;

        let mut target = completion_endpoint.clone();
        {
            let mut query = target.query_pairs_mut();
            query.append_pair(PARAM_HANDOFF_ID, context.handoff_id.as_str());
            match &context.flow {
                FlowMarker::PublicReferral => {
                    query.append_pair(PARAM_RETURN_URL, &context.return_url);
                }
                FlowMarker::InternalApplication {
                    application_id,
                    org_id,
                } => {
                    query.append_pair(PARAM_APPLICATION_ID, application_id);
                    query.append_pair(PARAM_ORG_ID, org_id);
                }
            }
        }
        tracing::info!(handoff_id = %context.handoff_id, flow = ?context.flow, "handoff context persisted");
        Ok(HandoffStart {
            handoff_id: context.handoff_id,
            redirect_target: target,
        })
    }
}

/// Outcome flag the provider may attach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Success,
    Failure,
}

/// Query parameters seen by the completion endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompletionParams {
    /// Only well-formed ids are kept.
    pub handoff_id: Option<HandoffId>,
    pub reference_id: Option<String>,
    pub status: Option<String>,
    pub return_url: Option<String>,
    pub mock: Option<String>,
    pub application_id: Option<String>,
    pub org_id: Option<String>,
}

impl CompletionParams {
    /// Parse from the query string of the completion URL.
    pub fn from_url(url: &Url) -> Self {
        Self::from_query(url.query().unwrap_or_default())
    }

    /// Parse a raw `application/x-www-form-urlencoded` query string.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Some(value.into_owned()).filter(|v| !v.is_empty());
            match key.as_ref() {
                PARAM_HANDOFF_ID => {
                    params.handoff_id = value.as_deref().and_then(HandoffId::parse)
                }
                PARAM_REFERENCE_ID => params.reference_id = value,
                PARAM_STATUS => params.status = value,
                PARAM_RETURN_URL => params.return_url = value,
                PARAM_MOCK => params.mock = value,
                PARAM_APPLICATION_ID => params.application_id = value,
                PARAM_ORG_ID => params.org_id = value,
                _ => {}
            }
        }
        params
    }

    /// Unknown status values are ignored rather than treated as failure.
    pub fn provider_status(&self) -> Option<ProviderStatus> {
        match self.status.as_deref()?.to_ascii_lowercase().as_str() {
            "success" => Some(ProviderStatus::Success),
            "failure" | "failed" => Some(ProviderStatus::Failure),
            _ => None,
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self.mock.as_deref(), Some("true") | Some("1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_parse_from_url() {
        let url = Url::parse(
            "https://app.example.com/digilocker/complete?id=ref-1&status=success&returnUrl=https%3A%2F%2Frefer.example.com%2Fapply%3Fcode%3DX&mock=true",
        )
        .unwrap();
        let params = CompletionParams::from_url(&url);
        assert_eq!(params.reference_id.as_deref(), Some("ref-1"));
        assert_eq!(params.provider_status(), Some(ProviderStatus::Success));
        assert_eq!(
            params.return_url.as_deref(),
            Some("https://refer.example.com/apply?code=X")
        );
        assert!(params.is_mock());
        assert_eq!(params.application_id, None);
    }

    #[test]
    fn empty_values_count_as_absent() {
        let url = Url::parse("https://app.example.com/c?returnUrl=&id=").unwrap();
        let params = CompletionParams::from_url(&url);
        assert_eq!(params.return_url, None);
        assert_eq!(params.reference_id, None);
    }

    #[test]
    fn malformed_handoff_id_is_dropped() {
        let id = HandoffId::new();
        let url = Url::parse(&format!("https://app.example.com/c?handoff={id}")).unwrap();
        assert_eq!(CompletionParams::from_url(&url).handoff_id, Some(id));

        let url = Url::parse("https://app.example.com/c?handoff=..%2Fsecrets").unwrap();
        assert_eq!(CompletionParams::from_url(&url).handoff_id, None);
    }

    #[test]
    fn begin_scopes_the_context_to_its_id() {
        use crate::storage::load_json;
        use std::collections::HashMap;
        use std::sync::Mutex;

        #[derive(Default)]
        struct MapStorage(Mutex<HashMap<String, String>>);
        impl RecoverableStorage for MapStorage {
            fn get(&self, key: &str) -> Result<Option<String>, HandoffError> {
                Ok(self.0.lock().unwrap().get(key).cloned())
            }
            fn set(&self, key: &str, value: &str) -> Result<(), HandoffError> {
                self.0.lock().unwrap().insert(key.into(), value.into());
                Ok(())
            }
            fn remove(&self, key: &str) -> Result<(), HandoffError> {
                self.0.lock().unwrap().remove(key);
                Ok(())
            }
        }

        let storage = MapStorage::default();
        let start = HandoffContext::begin(
            &storage,
            FlowMarker::PublicReferral,
            &Url::parse("https://refer.example.com/apply").unwrap(),
            &Url::parse("https://app.example.com/digilocker/complete").unwrap(),
            Timestamp::from_secs(10),
            60,
        )
        .unwrap();

        let params = CompletionParams::from_url(&start.redirect_target);
        assert_eq!(params.handoff_id.as_ref(), Some(&start.handoff_id));
        let stored: HandoffContext = load_json(&storage, &context_key(&start.handoff_id))
            .unwrap()
            .unwrap();
        assert_eq!(stored.handoff_id, start.handoff_id);
        assert_eq!(stored.expires_at, Timestamp::from_secs(70));
    }

    #[test]
    fn context_round_trips_through_json() {
        let context = HandoffContext {
            handoff_id: HandoffId::new(),
            return_url: "https://refer.example.com/apply".into(),
            flow: FlowMarker::InternalApplication {
                application_id: "app-1".into(),
                org_id: "org-1".into(),
            },
            created_at: Timestamp::from_secs(10),
            expires_at: Timestamp::from_secs(20),
        };
        let json = serde_json::to_string(&context).unwrap();
        let back: HandoffContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, context);
    }
}
