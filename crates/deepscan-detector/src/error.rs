//! Detection client error types.

use thiserror::Error;

pub type DetectorResult<T> = Result<T, DetectorError>;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("{0} is not set")]
    MissingCredential(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The scoring API answered with a non-success status.
    #[error("Detection API returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Detection API timed out after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),
}

impl DetectorError {
    /// Whether the scoring API itself reported the failure.
    pub fn is_upstream(&self) -> bool {
        matches!(self, DetectorError::Upstream { .. })
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DetectorError::MissingCredential(_) | DetectorError::InvalidConfig(_) => "config",
            DetectorError::Upstream { .. } => "upstream",
            DetectorError::InvalidRequest(_) => "invalid_request",
            DetectorError::InvalidResponse(_) => "invalid_response",
            DetectorError::Timeout(_) => "timeout",
            DetectorError::Network(_) => "network",
        }
    }
}
