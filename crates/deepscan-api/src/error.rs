//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use deepscan_detector::DetectorError;
use deepscan_media::MediaError;
use deepscan_models::AggregateError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Error reported by the scoring API, passed through with its status.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    GatewayTimeout(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Map a failure from the video path.
    ///
    /// Problems with the uploaded file stay client errors. Everything else
    /// is wrapped as an internal error carrying the cause.
    pub fn from_video_error(err: MediaError) -> Self {
        if err.is_client_error() {
            Self::BadRequest(err.to_string())
        } else {
            Self::Internal(format!("Error analyzing video: {}", err))
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DetectorError> for ApiError {
    fn from(err: DetectorError) -> Self {
        match err {
            DetectorError::Upstream { status, message } => ApiError::Upstream { status, message },
            DetectorError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            DetectorError::Network(e) => {
                ApiError::BadGateway(format!("Detection service unreachable: {}", e))
            }
            e @ DetectorError::Timeout(_) => ApiError::GatewayTimeout(e.to_string()),
            e @ DetectorError::InvalidResponse(_) => ApiError::BadGateway(e.to_string()),
            e @ (DetectorError::MissingCredential(_) | DetectorError::InvalidConfig(_)) => {
                ApiError::Internal(format!("Internal error: {}", e))
            }
        }
    }
}

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        ApiError::Internal(format!("Error analyzing video: {}", err))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            detail: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
