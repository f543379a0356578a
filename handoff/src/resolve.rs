//! Pure reconstruction of "who started this and what happens next" from the
//! completion parameters and the same-origin fallback, with no other state.

use loanflow_types::Timestamp;
use url::Url;

use crate::context::{CompletionParams, FlowMarker, HandoffContext, ProviderStatus};
use crate::error::HandoffError;
use crate::id::HandoffId;

/// Query parameters owned by the provider or the handoff itself; never
/// forwarded to the destination page.
const STRIPPED_PARAMS: &[&str] = &[
    "id",
    "status",
    "returnUrl",
    "mock",
    "handoff",
    "digilocker_success",
    "digilocker_failure",
    "digilocker_handoff",
];

pub const SUCCESS_FLAG: &str = "digilocker_success";
pub const FAILURE_FLAG: &str = "digilocker_failure";

/// Tells the destination page which stored payload is its own.
pub const LANDING_HANDOFF_PARAM: &str = "digilocker_handoff";

/// Where the caller came from, as far as the return URL can be trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnSource {
    /// The `returnUrl` query parameter; survives cross-origin redirects.
    QueryParam,
    /// The persisted same-origin context.
    StoredContext,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionPlan {
    /// Cross-domain referral flow: one reference-keyed lookup, then back to
    /// `return_url` with a success/failure flag.
    Public {
        handoff_id: Option<HandoffId>,
        return_url: Url,
        source: ReturnSource,
        reference_id: Option<String>,
        status: Option<ProviderStatus>,
        mock: bool,
    },
    /// Authenticated staff flow: lookup scoped to the application.
    Internal {
        handoff_id: Option<HandoffId>,
        application_id: String,
        org_id: String,
        reference_id: Option<String>,
        status: Option<ProviderStatus>,
    },
}

fn parse_return_url(raw: &str) -> Result<Url, HandoffError> {
    let url = Url::parse(raw)
        .map_err(|e| HandoffError::Parse(format!("return URL {raw:?} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(HandoffError::Parse(format!(
            "return URL scheme {other:?} is not allowed"
        ))),
    }
}

/// Decide the caller of a completion request.
///
/// Precedence: `returnUrl` parameter, then `applicationId`+`orgId`
/// parameters, then a non-expired stored context belonging to the request's
/// `handoff` id. With none of them the result is a terminal
/// [`HandoffError::Parse`].
pub fn resolve(
    params: &CompletionParams,
    stored: Option<&HandoffContext>,
    now: Timestamp,
) -> Result<CompletionPlan, HandoffError> {
    let status = params.provider_status();
    let reference_id = params.reference_id.clone();
    let handoff_id = params.handoff_id.clone();

    if let Some(raw) = params.return_url.as_deref() {
        return Ok(CompletionPlan::Public {
            handoff_id,
            return_url: parse_return_url(raw)?,
            source: ReturnSource::QueryParam,
            reference_id,
            status,
            mock: params.is_mock(),
        });
    }

    if let (Some(application_id), Some(org_id)) = (&params.application_id, &params.org_id) {
        return Ok(CompletionPlan::Internal {
            handoff_id,
            application_id: application_id.clone(),
            org_id: org_id.clone(),
            reference_id,
            status,
        });
    }

    let context = stored
        .filter(|c| handoff_id.as_ref() == Some(&c.handoff_id) && !c.is_expired(now))
        .ok_or_else(|| {
            HandoffError::Parse(
                "no return URL in the request and no saved handoff context".into(),
            )
        })?;

    match &context.flow {
        FlowMarker::PublicReferral => Ok(CompletionPlan::Public {
            handoff_id,
            return_url: parse_return_url(&context.return_url)?,
            source: ReturnSource::StoredContext,
            reference_id,
            status,
            mock: params.is_mock(),
        }),
        FlowMarker::InternalApplication {
            application_id,
            org_id,
        } => Ok(CompletionPlan::Internal {
            handoff_id,
            application_id: application_id.clone(),
            org_id: org_id.clone(),
            reference_id,
            status,
        }),
    }
}

/// The destination URL with provider parameters removed and exactly one
/// outcome flag appended, followed by the id of the stored payload if any.
pub fn outbound_url(return_url: &Url, success: bool, payload: Option<&HandoffId>) -> Url {
    let kept: Vec<(String, String)> = return_url
        .query_pairs()
        .filter(|(k, _)| !STRIPPED_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = return_url.clone();
    url.set_query(None);
    {
        let mut query = url.query_pairs_mut();
        for (k, v) in &kept {
            query.append_pair(k, v);
        }
        query.append_pair(if success { SUCCESS_FLAG } else { FAILURE_FLAG }, "true");
        if let Some(id) = payload {
            query.append_pair(LANDING_HANDOFF_PARAM, id.as_str());
        }
    }
    url
}

/// The payload id the completion endpoint attached to the destination URL.
pub fn landing_handoff_id(landing: &Url) -> Option<HandoffId> {
    landing
        .query_pairs()
        .find(|(k, _)| k == LANDING_HANDOFF_PARAM)
        .and_then(|(_, v)| HandoffId::parse(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CompletionParams {
        CompletionParams::default()
    }

    fn stored_public(expires_secs: u64) -> HandoffContext {
        HandoffContext {
            handoff_id: HandoffId::parse("00000000000000000000000000000001").unwrap(),
            return_url: "https://refer.example.com/apply/abc".into(),
            flow: FlowMarker::PublicReferral,
            created_at: Timestamp::from_secs(0),
            expires_at: Timestamp::from_secs(expires_secs),
        }
    }

    #[test]
    fn return_url_param_alone_resolves_public() {
        let p = CompletionParams {
            return_url: Some("https://refer.example.com/apply/abc".into()),
            reference_id: Some("ref-9".into()),
            ..params()
        };
        let plan = resolve(&p, None, Timestamp::from_secs(1)).unwrap();
        match plan {
            CompletionPlan::Public {
                source,
                reference_id,
                ..
            } => {
                assert_eq!(source, ReturnSource::QueryParam);
                assert_eq!(reference_id.as_deref(), Some("ref-9"));
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn param_wins_over_stored_context() {
        let p = CompletionParams {
            return_url: Some("https://other.example.com/x".into()),
            ..params()
        };
        let stored = stored_public(100);
        let plan = resolve(&p, Some(&stored), Timestamp::from_secs(1)).unwrap();
        assert!(matches!(
            plan,
            CompletionPlan::Public { ref return_url, .. } if return_url.host_str() == Some("other.example.com")
        ));
    }

    fn with_handoff(context: &HandoffContext) -> CompletionParams {
        CompletionParams {
            handoff_id: Some(context.handoff_id.clone()),
            ..params()
        }
    }

    #[test]
    fn stored_context_is_the_fallback() {
        let stored = stored_public(100);
        let plan = resolve(&with_handoff(&stored), Some(&stored), Timestamp::from_secs(1)).unwrap();
        assert!(matches!(
            plan,
            CompletionPlan::Public {
                source: ReturnSource::StoredContext,
                handoff_id: Some(ref id),
                ..
            } if *id == stored.handoff_id
        ));
    }

    #[test]
    fn stored_context_of_another_handoff_is_not_used() {
        let stored = stored_public(100);
        for p in [
            params(),
            CompletionParams {
                handoff_id: Some(HandoffId::new()),
                ..params()
            },
        ] {
            assert!(matches!(
                resolve(&p, Some(&stored), Timestamp::from_secs(1)),
                Err(HandoffError::Parse(_))
            ));
        }
    }

    #[test]
    fn nothing_to_go_on_is_a_parse_error() {
        assert!(matches!(
            resolve(&params(), None, Timestamp::from_secs(1)),
            Err(HandoffError::Parse(_))
        ));
    }

    #[test]
    fn expired_stored_context_is_ignored() {
        assert!(matches!(
            resolve(
                &with_handoff(&stored_public(100)),
                Some(&stored_public(100)),
                Timestamp::from_secs(100)
            ),
            Err(HandoffError::Parse(_))
        ));
    }

    #[test]
    fn unparseable_return_url_is_terminal() {
        for raw in ["not a url", "javascript:alert(1)"] {
            let p = CompletionParams {
                return_url: Some(raw.into()),
                ..params()
            };
            assert!(matches!(
                resolve(&p, None, Timestamp::from_secs(1)),
                Err(HandoffError::Parse(_))
            ));
        }
    }

    #[test]
    fn internal_ids_resolve_internal() {
        let p = CompletionParams {
            application_id: Some("app-1".into()),
            org_id: Some("org-1".into()),
            reference_id: Some("ref".into()),
            ..params()
        };
        let plan = resolve(&p, None, Timestamp::from_secs(1)).unwrap();
        assert_eq!(
            plan,
            CompletionPlan::Internal {
                handoff_id: None,
                application_id: "app-1".into(),
                org_id: "org-1".into(),
                reference_id: Some("ref".into()),
                status: None,
            }
        );
    }

    #[test]
    fn outbound_strips_provider_params_and_adds_one_flag() {
        let url = Url::parse(
            "https://refer.example.com/apply?code=abc&ref=partner&id=ref-1&status=success&digilocker_failure=true&digilocker_handoff=old",
        )
        .unwrap();
        let out = outbound_url(&url, true, None);
        let pairs: Vec<(String, String)> = out
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("code".to_string(), "abc".to_string()),
                ("ref".to_string(), "partner".to_string()),
                ("digilocker_success".to_string(), "true".to_string()),
            ]
        );
        assert_eq!(out.path(), "/apply");
    }

    #[test]
    fn landing_url_names_the_payload() {
        let id = HandoffId::new();
        let url = Url::parse("https://refer.example.com/apply?code=abc").unwrap();
        let out = outbound_url(&url, true, Some(&id));
        assert_eq!(landing_handoff_id(&out), Some(id));
        assert_eq!(landing_handoff_id(&url), None);
    }
}
