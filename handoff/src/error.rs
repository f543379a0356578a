use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandoffError {
    /// Missing or malformed return context. Terminal for the sub-flow: the
    /// applicant has to restart from the referring page.
    #[error("cannot resume verification: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("provider lookup failed: {0}")]
    Lookup(String),
}

impl From<serde_json::Error> for HandoffError {
    fn from(e: serde_json::Error) -> Self {
        HandoffError::Storage(format!("corrupt stored value: {e}"))
    }
}

impl From<std::io::Error> for HandoffError {
    fn from(e: std::io::Error) -> Self {
        HandoffError::Storage(e.to_string())
    }
}
