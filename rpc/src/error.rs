//! RPC error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use loanflow_handoff::HandoffError;
use thiserror::Error;

use crate::handlers::ErrorResponse;

#[derive(Debug, Error)]
pub enum RpcError {
    /// The applicant has to restart from the page that referred them.
    #[error("{0}")]
    Handoff(#[from] HandoffError),

    /// Internal completions are staff-only.
    #[error("staff credentials required")]
    Unauthorized,

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::Handoff(HandoffError::Parse(_)) => StatusCode::BAD_REQUEST,
            RpcError::Handoff(HandoffError::Lookup(_)) => StatusCode::BAD_GATEWAY,
            RpcError::Unauthorized => StatusCode::UNAUTHORIZED,
            RpcError::Handoff(HandoffError::Storage(_)) | RpcError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        let restart = matches!(self, RpcError::Handoff(HandoffError::Parse(_)));
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                restart,
            }),
        )
            .into_response()
    }
}
