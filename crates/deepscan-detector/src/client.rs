//! Scoring API HTTP client.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use deepscan_models::FrameVerdict;
use metrics::{counter, histogram};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::DetectorConfig;
use crate::error::{DetectorError, DetectorResult};
use crate::types::{error_message, CheckResponse};

/// Anything that can turn one still image into a verdict.
#[async_trait]
pub trait ImageScorer: Send + Sync {
    async fn score(&self, image: Vec<u8>, content_type: &str) -> DetectorResult<FrameVerdict>;
}

/// Client for the Sightengine deepfake model.
pub struct DetectionClient {
    http: Client,
    config: DetectorConfig,
    permits: Arc<Semaphore>,
}

impl DetectionClient {
    /// Create a new detection client.
    pub fn new(config: DetectorConfig) -> DetectorResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(DetectorError::Network)?;

        let permits = Arc::new(Semaphore::new(config.max_in_flight.max(1)));

        Ok(Self {
            http,
            config,
            permits,
        })
    }

    /// Send one image to the scoring API and normalize the result.
    pub async fn analyze_image(
        &self,
        image: Vec<u8>,
        content_type: &str,
    ) -> DetectorResult<FrameVerdict> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| DetectorError::InvalidConfig("request limiter closed".to_string()))?;

        let size = image.len();
        let media = Part::bytes(image)
            .file_name("media")
            .mime_str(content_type)
            .map_err(|_| DetectorError::InvalidRequest(format!("invalid content type: {content_type}")))?;

        let credentials = &self.config.credentials;
        let form = Form::new()
            .part("media", media)
            .text("models", self.config.models.clone())
            .text("api_user", credentials.api_user.clone())
            .text("api_secret", credentials.api_secret.clone());

        debug!(size, content_type, "Sending image to detection API");

        let start = Instant::now();
        let result = self.send(form).await;
        let elapsed = start.elapsed().as_secs_f64();

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        counter!("deepscan_detector_requests_total", "outcome" => outcome).increment(1);
        histogram!("deepscan_detector_request_duration_seconds").record(elapsed);

        result
    }

    async fn send(&self, form: Form) -> DetectorResult<FrameVerdict> {
        let response = self
            .http
            .post(&self.config.endpoint)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = error_message(&body);
            warn!(status = status.as_u16(), %message, "Detection API returned an error");
            return Err(DetectorError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let check: CheckResponse = serde_json::from_str(&body)
            .map_err(|e| DetectorError::InvalidResponse(format!("unparseable body: {e}")))?;

        // Quota and credential errors can arrive with a 2xx status
        if check.is_failure() {
            let message = error_message(&body);
            warn!(status = status.as_u16(), %message, "Detection API reported a failure");
            return Err(DetectorError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message,
            });
        }

        let score = match check.deepfake_score() {
            Some(score) => score,
            None => {
                warn!(status = ?check.status, "Detection response had no deepfake score, assuming 0");
                0.0
            }
        };

        Ok(FrameVerdict::from_score(score, self.config.threshold))
    }

    fn transport_error(&self, e: reqwest::Error) -> DetectorError {
        if e.is_timeout() {
            DetectorError::Timeout(self.config.timeout.as_secs())
        } else {
            DetectorError::Network(e)
        }
    }
}

#[async_trait]
impl ImageScorer for DetectionClient {
    async fn score(&self, image: Vec<u8>, content_type: &str) -> DetectorResult<FrameVerdict> {
        self.analyze_image(image, content_type).await
    }
}
