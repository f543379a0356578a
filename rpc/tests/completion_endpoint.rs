use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use loanflow_handoff::{HandoffCompletion, MemoryViewCache};
use loanflow_nullables::{NullBackend, NullClock, NullStorage};
use loanflow_rpc::{router, AppState};
use loanflow_types::{DocumentVerification, FlowParams};
use tower::ServiceExt;

const STAFF_TOKEN: &str = "staff-token-1";

fn app(backend: Arc<NullBackend>) -> axum::Router {
    let completion = HandoffCompletion::new(
        backend,
        Arc::new(NullStorage::new()),
        Arc::new(MemoryViewCache::new()),
        Arc::new(NullClock::new(1_700_000_000_000)),
        &FlowParams::default(),
    );
    router(Arc::new(AppState {
        completion,
        internal_token: Some(STAFF_TOKEN.to_string()),
    }))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn staff_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn document() -> DocumentVerification {
    DocumentVerification {
        reference_id: Some("ref-1".into()),
        name: "Kiran Rao".into(),
        masked_aadhaar: Some("XXXX-XXXX-0001".into()),
        date_of_birth: None,
        gender: None,
        address: None,
        placeholder: false,
    }
}

#[tokio::test]
async fn public_completion_redirects_with_success_flag() {
    let backend = Arc::new(NullBackend::new());
    backend.set_document("ref-1", document());
    let response = app(backend)
        .oneshot(get(
            "/digilocker/complete?id=ref-1&status=success&returnUrl=https%3A%2F%2Fpartner.example.org%2Fapply%3Fref%3Dp1",
        ))
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(
        location.starts_with(
            "https://partner.example.org/apply?ref=p1&digilocker_success=true&digilocker_handoff="
        ),
        "{location}"
    );
}

#[tokio::test]
async fn missing_return_context_is_a_bad_request() {
    let response = app(Arc::new(NullBackend::new()))
        .oneshot(get("/digilocker/complete?id=ref-1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["restart"], true);
}

#[tokio::test]
async fn internal_completion_returns_summary() {
    let backend = Arc::new(NullBackend::new());
    backend.set_document("ref-1", document());
    let response = app(backend)
        .oneshot(staff_get(
            "/digilocker/complete?applicationId=app-5&orgId=org-2&id=ref-1",
            STAFF_TOKEN,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["applicationId"], "app-5");
    assert_eq!(json["name"], "Kiran Rao");
    assert_eq!(json["detailPath"], "/applications/app-5");
    assert_eq!(json["detailsPending"], false);
    assert_eq!(json["autoAdvanceSecs"], 5);
}

#[tokio::test]
async fn internal_completion_needs_staff_credentials() {
    let backend = Arc::new(NullBackend::new());
    backend.set_document("ref-1", document());
    let uri = "/digilocker/complete?applicationId=app-5&orgId=org-2&id=ref-1";

    for request in [get(uri), staff_get(uri, "guess")] {
        let response = app(backend.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json.get("name").is_none());
        assert_eq!(json["restart"], false);
    }
    assert!(backend.digilocker_lookups().is_empty());
}

#[tokio::test]
async fn health_reports_ok() {
    let response = app(Arc::new(NullBackend::new()))
        .oneshot(get("/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
