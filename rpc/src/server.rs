//! Axum-based HTTP server.

use std::future::Future;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use loanflow_handoff::HandoffCompletion;
use tracing::info;

use crate::error::RpcError;
use crate::handlers::{complete_digilocker, health};

pub const COMPLETION_PATH: &str = "/digilocker/complete";

pub struct AppState {
    pub completion: HandoffCompletion,
    /// Bearer token staff callers present on internal completions. With
    /// none configured, internal completions are refused.
    pub internal_token: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(COMPLETION_PATH, get(complete_digilocker))
        .route("/health", get(health))
        .with_state(state)
}

pub struct RpcServer {
    pub port: u16,
    pub state: Arc<AppState>,
}

impl RpcServer {
    pub fn new(port: u16, state: Arc<AppState>) -> Self {
        Self { port, state }
    }

    /// Serve until `shutdown` resolves.
    pub async fn start(
        &self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), RpcError> {
        let app = router(self.state.clone());
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {addr}: {e}")))?;
        info!("HTTP server listening on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        info!("HTTP server stopped");
        Ok(())
    }
}
