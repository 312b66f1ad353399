//! Upload analysis handler.

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use deepscan_models::{format_megabytes, MediaKind, MediaUpload};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::services::Analysis;
use crate::state::AppState;

/// Name of the multipart field carrying the upload.
pub const UPLOAD_FIELD: &str = "file";

const UNSUPPORTED_TYPE: &str = "Only image and video files are supported";

/// Verdict returned for an analyzed upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub is_deepfake: bool,
    pub confidence: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<usize>,
}

impl From<Analysis> for AnalysisResponse {
    fn from(analysis: Analysis) -> Self {
        match analysis {
            Analysis::Image(verdict) => Self {
                is_deepfake: verdict.is_flagged,
                confidence: verdict.confidence,
                message: verdict.message(),
                frame_count: None,
            },
            Analysis::Video(verdict) => Self {
                is_deepfake: verdict.is_flagged,
                confidence: verdict.confidence,
                message: verdict.message,
                frame_count: Some(verdict.frame_count),
            },
        }
    }
}

/// Analyze an uploaded image or video.
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<AnalysisResponse>> {
    let mut multipart =
        multipart.map_err(|e| ApiError::bad_request(format!("Invalid multipart request: {}", e)))?;

    let upload = read_upload(&mut multipart, state.config.max_upload_bytes).await?;

    info!(
        kind = %upload.kind,
        content_type = %upload.content_type,
        size = upload.declared_size(),
        "Analyzing upload"
    );

    let analysis = state.analyzer.analyze(upload).await?;

    Ok(Json(analysis.into()))
}

/// Pull the upload out of the form, validating type and size while streaming.
async fn read_upload(multipart: &mut Multipart, max_bytes: usize) -> ApiResult<MediaUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let is_upload = field.name() == Some(UPLOAD_FIELD) || field.file_name().is_some();
        if !is_upload {
            debug!(field = ?field.name(), "Skipping form field");
            continue;
        }

        return read_field(field, max_bytes).await;
    }

    Err(ApiError::bad_request(format!(
        "Missing '{}' field in form data",
        UPLOAD_FIELD
    )))
}

async fn read_field(mut field: Field<'_>, max_bytes: usize) -> ApiResult<MediaUpload> {
    let content_type = field
        .content_type()
        .map(str::to_string)
        .filter(|ct| MediaKind::from_content_type(ct).is_some())
        .ok_or_else(|| ApiError::bad_request(UNSUPPORTED_TYPE))?;

    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if data.len() + chunk.len() > max_bytes {
            return Err(too_large(max_bytes));
        }
        data.extend_from_slice(&chunk);
    }

    if data.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }

    MediaUpload::new(data, content_type).ok_or_else(|| ApiError::bad_request(UNSUPPORTED_TYPE))
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::PayloadTooLarge(format!(
        "File size must be less than {}",
        format_megabytes(max_bytes)
    ))
}

/// The body limit layer surfaces as a multipart error with a 413 status.
fn multipart_error(err: MultipartError, max_bytes: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(max_bytes)
    } else {
        ApiError::bad_request(format!("Invalid multipart request: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepscan_models::{AggregateVerdict, FrameVerdict};

    #[test]
    fn test_image_response_has_no_frame_count() {
        let response = AnalysisResponse::from(Analysis::Image(FrameVerdict::new(72.5, true)));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["isDeepfake"], true);
        assert_eq!(json["confidence"], 72.5);
        assert_eq!(json["message"], "Deepfake confidence is 72.50%");
        assert!(json.get("frameCount").is_none());
    }

    #[test]
    fn test_video_response_has_frame_count() {
        let verdict = AggregateVerdict {
            confidence: 40.0,
            is_flagged: false,
            frame_count: 10,
            message: "Average deepfake confidence is 40.00% based on 10 frames.".to_string(),
        };
        let json = serde_json::to_value(AnalysisResponse::from(Analysis::Video(verdict))).unwrap();

        assert_eq!(json["isDeepfake"], false);
        assert_eq!(json["frameCount"], 10);
    }

    #[test]
    fn test_too_large_message() {
        let err = too_large(10 * 1024 * 1024);
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.to_string(), "File size must be less than 10MB");
    }
}
