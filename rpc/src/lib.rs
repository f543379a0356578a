//! HTTP server for the applicant flow.
//!
//! Provides endpoints for:
//! - DigiLocker redirect completion (`GET /digilocker/complete`)
//! - Liveness (`GET /health`)

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{router, AppState, RpcServer};
