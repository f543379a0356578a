//! Backend client for the applicant flow.
//!
//! Every component that talks to the hosted backend depends on the
//! [`Backend`] trait only. [`HttpBackend`] is the production implementation;
//! tests use the nullable backend from `loanflow-nullables`.

pub mod backend;
pub mod error;
pub mod http;
pub mod wire;

pub use backend::{Backend, OtpIssued, VideoReceipt};
pub use error::ClientError;
pub use http::HttpBackend;
