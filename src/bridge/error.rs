use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("identity provider error: {0}")]
    Provider(String),
    #[error("session endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("session endpoint returned {0}")]
    Status(StatusCode),
    #[error("invalid session endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}
