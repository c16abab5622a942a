use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error as ThisError;

use super::IsRetryable;

#[derive(Debug, ThisError)]
pub enum UpstairsError {
    #[error("Upstream error with status {status}: {body}")]
    UpstreamStatus { status: StatusCode, body: String },

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("API root cannot be used as a base URL: {0}")]
    InvalidApiRoot(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] figment::Error),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl UpstairsError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UpstairsError::UpstreamStatus { status, .. } => Some(*status),
            UpstairsError::ReqwestError(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

impl IsRetryable for UpstairsError {
    fn is_retryable(&self) -> bool {
        match self {
            UpstairsError::ReqwestError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            UpstairsError::UpstreamStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            UpstairsError::Timeout(_) => true,
            _ => false,
        }
    }
}
