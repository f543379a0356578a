//! Shared utilities for the applicant verification flow.

pub mod logging;
pub mod time;

pub use logging::{init_logging, LogFormat};
pub use time::format_countdown;
