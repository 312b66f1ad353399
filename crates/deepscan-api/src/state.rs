//! Application state.

use std::sync::Arc;

use deepscan_detector::{DetectionClient, DetectorConfig};
use deepscan_media::{FrameSampler, FrameSamplerConfig};

use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::services::MediaAnalyzer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub analyzer: Arc<MediaAnalyzer>,
}

impl AppState {
    /// Create new application state backed by the detection API and ffmpeg.
    pub fn new(
        config: ApiConfig,
        detector: DetectorConfig,
        sampler: FrameSamplerConfig,
    ) -> ApiResult<Self> {
        let client = DetectionClient::new(detector)?;
        let sampler = FrameSampler::with_ffmpeg(sampler);
        let analyzer = MediaAnalyzer::new(Arc::new(client), sampler);

        Ok(Self::from_parts(config, analyzer))
    }

    /// Assemble state from an already built analyzer.
    pub fn from_parts(config: ApiConfig, analyzer: MediaAnalyzer) -> Self {
        Self {
            config,
            analyzer: Arc::new(analyzer),
        }
    }
}
