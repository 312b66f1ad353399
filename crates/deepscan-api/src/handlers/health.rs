//! Health check handlers.

use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use deepscan_media::{check_ffmpeg, check_ffprobe};
use serde::Serialize;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness response.
#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub ffmpeg: bool,
    pub ffprobe: bool,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness check endpoint.
///
/// Videos cannot be analyzed without ffmpeg and ffprobe on the PATH.
pub async fn ready() -> (StatusCode, Json<ReadyResponse>) {
    let ffmpeg = check_ffmpeg().is_ok();
    let ffprobe = check_ffprobe().is_ok();
    let is_ready = ffmpeg && ffprobe;

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if is_ready { "ready" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now().to_rfc3339(),
            ffmpeg,
            ffprobe,
        }),
    )
}
