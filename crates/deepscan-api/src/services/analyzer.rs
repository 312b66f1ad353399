//! Media analysis orchestration.
//!
//! Images go straight to the scorer. Videos are sampled into stills, every
//! still is scored concurrently, and the verdicts are aggregated once all
//! calls have resolved. A single failed frame fails the whole video.

use std::sync::Arc;
use std::time::Instant;

use deepscan_detector::ImageScorer;
use deepscan_media::FrameSampler;
use deepscan_models::{aggregate, AggregateVerdict, Frame, FrameVerdict, MediaKind, MediaUpload};
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Outcome of analyzing one upload.
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    Image(FrameVerdict),
    Video(AggregateVerdict),
}

impl Analysis {
    pub fn is_flagged(&self) -> bool {
        match self {
            Analysis::Image(v) => v.is_flagged,
            Analysis::Video(v) => v.is_flagged,
        }
    }
}

/// Routes uploads to the image or video pipeline.
#[derive(Clone)]
pub struct MediaAnalyzer {
    scorer: Arc<dyn ImageScorer>,
    sampler: FrameSampler,
}

impl MediaAnalyzer {
    pub fn new(scorer: Arc<dyn ImageScorer>, sampler: FrameSampler) -> Self {
        Self { scorer, sampler }
    }

    /// Analyze a validated upload.
    pub async fn analyze(&self, upload: MediaUpload) -> ApiResult<Analysis> {
        let kind = upload.kind;
        let start = Instant::now();

        let analysis = match kind {
            MediaKind::Image => Analysis::Image(self.analyze_image(upload).await?),
            MediaKind::Video => Analysis::Video(self.analyze_video(upload).await?),
        };

        metrics::record_verdict(kind.as_str(), analysis.is_flagged());
        metrics::record_analysis_duration(kind.as_str(), start.elapsed().as_secs_f64());

        Ok(analysis)
    }

    /// Score a single image upload.
    pub async fn analyze_image(&self, upload: MediaUpload) -> ApiResult<FrameVerdict> {
        let verdict = self.scorer.score(upload.data, &upload.content_type).await?;
        info!(
            confidence = verdict.confidence,
            flagged = verdict.is_flagged,
            "Image analyzed"
        );
        Ok(verdict)
    }

    /// Sample a video, score every frame and aggregate.
    pub async fn analyze_video(&self, upload: MediaUpload) -> ApiResult<AggregateVerdict> {
        let frames = self
            .sampler
            .sample(&upload.data, &upload.content_type)
            .await
            .map_err(ApiError::from_video_error)?;
        drop(upload);

        let verdicts = try_join_all(frames.into_iter().map(|frame| self.score_frame(frame))).await?;

        let verdict = aggregate(&verdicts)?;
        info!(
            frames = verdict.frame_count,
            confidence = verdict.confidence,
            flagged = verdict.is_flagged,
            "Video analyzed"
        );
        Ok(verdict)
    }

    async fn score_frame(&self, frame: Frame) -> ApiResult<FrameVerdict> {
        let index = frame.index;
        let verdict = self.scorer.score(frame.data, Frame::CONTENT_TYPE).await?;
        debug!(index, confidence = verdict.confidence, "Frame scored");
        Ok(verdict)
    }
}
