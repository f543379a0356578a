//! Request handlers and response bodies.

use std::sync::Arc;

use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Json, Redirect, Response};
use loanflow_handoff::{CompletionOutcome, CompletionParams, CompletionPlan};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::RpcError;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// The sub-flow cannot continue; start again from the referring page.
    pub restart: bool,
}

/// Shown on the internal completion page before auto-advancing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalCompletionResponse {
    pub application_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_aadhaar: Option<String>,
    pub details_pending: bool,
    pub detail_path: String,
    pub auto_advance_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Equal length and equal bytes, without stopping at the first mismatch.
fn token_matches(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn authorize_staff(headers: &HeaderMap, expected: Option<&str>) -> Result<(), RpcError> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match (presented, expected) {
        (Some(presented), Some(expected)) if token_matches(presented, expected) => Ok(()),
        _ => Err(RpcError::Unauthorized),
    }
}

/// Provider redirect target. Public callers are redirected back to their
/// return URL; staff callers of the internal flow get a summary to display.
pub async fn complete_digilocker(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Response, RpcError> {
    let params = CompletionParams::from_query(query.as_deref().unwrap_or_default());
    let plan = state.completion.plan(&params).map_err(|e| {
        warn!(error = %e, "digilocker completion cannot be resolved");
        RpcError::from(e)
    })?;
    if matches!(plan, CompletionPlan::Internal { .. }) {
        authorize_staff(&headers, state.internal_token.as_deref()).map_err(|e| {
            warn!("internal completion without valid staff credentials");
            e
        })?;
    }
    let outcome = state.completion.run(plan).await.map_err(|e| {
        warn!(error = %e, "digilocker completion failed");
        RpcError::from(e)
    })?;

    match outcome {
        CompletionOutcome::Public(redirect) => {
            info!(success = redirect.success, "redirecting to referring page");
            Ok(Redirect::to(redirect.location.as_str()).into_response())
        }
        CompletionOutcome::Internal(done) => {
            // The countdown runs on the page; only its length is reported.
            let auto_advance_secs = done.auto_advance.remaining_secs();
            done.auto_advance.cancel();
            Ok(Json(InternalCompletionResponse {
                application_id: done.application_id,
                name: done.document.name,
                masked_aadhaar: done.document.masked_aadhaar,
                details_pending: done.document.placeholder,
                detail_path: done.detail_path,
                auto_advance_secs,
            })
            .into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn staff_token_must_match_exactly() {
        assert!(authorize_staff(&bearer("s3cret"), Some("s3cret")).is_ok());
        assert!(authorize_staff(&bearer("s3cret"), Some("s3cre")).is_err());
        assert!(authorize_staff(&bearer("s3creT"), Some("s3cret")).is_err());
        assert!(authorize_staff(&HeaderMap::new(), Some("s3cret")).is_err());
    }

    #[test]
    fn no_configured_token_refuses_everyone() {
        assert!(matches!(
            authorize_staff(&bearer("anything"), None),
            Err(RpcError::Unauthorized)
        ));
    }
}
