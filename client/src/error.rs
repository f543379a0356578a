use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("backend returned HTTP {0}")]
    Status(u16),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("invalid backend URL: {0}")]
    Url(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ClientError::Status(status.as_u16()),
            None => ClientError::Transport(e.to_string()),
        }
    }
}
