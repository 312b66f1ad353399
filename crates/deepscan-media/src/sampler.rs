//! Evenly spaced frame sampling.
//!
//! Sampling works on an in-memory video buffer. The bytes are spilled to a
//! scoped temporary file for the decoder and the file is removed when the
//! guard drops, whichever way sampling exits.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use deepscan_models::Frame;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::decoder::{FfmpegDecoder, VideoDecoder};
use crate::error::{MediaError, MediaResult};

/// Frame sampler configuration.
#[derive(Debug, Clone)]
pub struct FrameSamplerConfig {
    /// Number of frames to sample per video
    pub target_frames: usize,
    /// JPEG quality for re-encoded frames (1-100)
    pub jpeg_quality: u8,
    /// Timeout for decoding a single frame
    pub decode_timeout: Duration,
}

impl Default for FrameSamplerConfig {
    fn default() -> Self {
        Self {
            target_frames: 10,
            jpeg_quality: 90,
            decode_timeout: Duration::from_secs(30),
        }
    }
}

impl FrameSamplerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            target_frames: std::env::var("VIDEO_SAMPLE_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n >= 1)
                .unwrap_or(defaults.target_frames),
            jpeg_quality: std::env::var("FRAME_JPEG_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|q: u8| q.clamp(1, 100))
                .unwrap_or(defaults.jpeg_quality),
            decode_timeout: std::env::var("FRAME_DECODE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.decode_timeout),
        }
    }
}

/// Compute evenly spaced frame indices across `[0, total_frames - 1]`.
///
/// Never returns more indices than there are frames. With more than one
/// index the first and last frames are always included.
pub fn sample_indices(total_frames: u64, target: usize) -> Vec<u64> {
    let count = (target as u64).min(total_frames);
    match count {
        0 => Vec::new(),
        1 => vec![0],
        _ => {
            // Widened so huge frame counts from bad metadata cannot overflow
            let last = u128::from(total_frames - 1);
            let steps = u128::from(count - 1);
            (0..count)
                .map(|i| (u128::from(i) * last / steps) as u64)
                .collect()
        }
    }
}

/// Extracts a fixed number of evenly spaced stills from a video.
#[derive(Clone)]
pub struct FrameSampler {
    config: FrameSamplerConfig,
    decoder: Arc<dyn VideoDecoder>,
}

impl FrameSampler {
    pub fn new(config: FrameSamplerConfig, decoder: Arc<dyn VideoDecoder>) -> Self {
        Self { config, decoder }
    }

    /// Sampler backed by the ffmpeg CLI.
    pub fn with_ffmpeg(config: FrameSamplerConfig) -> Self {
        let decoder = Arc::new(FfmpegDecoder::new(config.decode_timeout));
        Self::new(config, decoder)
    }

    /// Sample frames from a complete video buffer.
    ///
    /// Frames that fail to seek or decode are skipped, so the result may be
    /// shorter than the target. An empty result is reported as
    /// [`MediaError::NoFramesExtracted`].
    pub async fn sample(&self, video: &[u8], content_type: &str) -> MediaResult<Vec<Frame>> {
        let temp = tempfile::Builder::new()
            .prefix("deepscan-")
            .suffix(&format!(".{}", video_extension(content_type)))
            .tempfile()?;
        tokio::fs::write(temp.path(), video).await?;

        let info = match self.decoder.probe(temp.path()).await {
            Ok(info) => info,
            Err(e) if e.is_host_error() => return Err(e),
            Err(e) => {
                warn!(error = %e, size = video.len(), "Video container could not be opened");
                return Err(MediaError::UnreadableVideo(e.to_string()));
            }
        };

        let indices = sample_indices(info.frame_count, self.config.target_frames);
        debug!(
            frame_count = info.frame_count,
            fps = info.fps,
            sampled = indices.len(),
            "Probed video"
        );

        let mut frames = Vec::with_capacity(indices.len());
        for index in indices {
            let image = match self.decoder.decode_frame(temp.path(), &info, index).await {
                Ok(image) => image,
                Err(e) => {
                    warn!(index, error = %e, "Skipping frame");
                    counter!("deepscan_frames_skipped_total").increment(1);
                    continue;
                }
            };

            match encode_jpeg(&image, self.config.jpeg_quality) {
                Ok(data) => frames.push(Frame::new(index, data)),
                Err(e) => {
                    warn!(index, error = %e, "Skipping frame that failed to encode");
                    counter!("deepscan_frames_skipped_total").increment(1);
                }
            }
        }

        if frames.is_empty() {
            return Err(MediaError::NoFramesExtracted);
        }

        counter!("deepscan_frames_sampled_total").increment(frames.len() as u64);
        info!(frames = frames.len(), "Sampled video frames");

        Ok(frames)
    }
}

/// Encode a decoded frame as a baseline JPEG.
fn encode_jpeg(image: &DynamicImage, quality: u8) -> MediaResult<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ColorType::Rgb8,
    )?;
    Ok(buf.into_inner())
}

/// File extension hint for the temporary copy of a video.
fn video_extension(content_type: &str) -> &'static str {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "video/x-matroska" => "mkv",
        "video/x-msvideo" => "avi",
        "video/mpeg" => "mpg",
        _ => "mp4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use image::{ImageFormat, Rgb, RgbImage};
    use tokio_test::{assert_err, assert_ok};

    use crate::probe::VideoInfo;

    #[derive(Default)]
    struct FakeDecoder {
        frame_count: u64,
        unreadable: bool,
        missing_tool: bool,
        spawn_fails: bool,
        broken_frames: HashSet<u64>,
        decoded: Mutex<Vec<u64>>,
        paths: Mutex<Vec<PathBuf>>,
    }

    impl FakeDecoder {
        fn with_frames(frame_count: u64) -> Self {
            Self {
                frame_count,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl VideoDecoder for FakeDecoder {
        async fn probe(&self, path: &Path) -> MediaResult<VideoInfo> {
            assert!(path.exists(), "decoder must receive a real file");
            self.paths.lock().unwrap().push(path.to_path_buf());
            if self.missing_tool {
                return Err(MediaError::FfprobeNotFound);
            }
            if self.spawn_fails {
                return Err(MediaError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "permission denied",
                )));
            }
            if self.unreadable {
                return Err(MediaError::FfprobeFailed {
                    message: "FFprobe failed".to_string(),
                    stderr: Some("Invalid data found when processing input".to_string()),
                });
            }
            Ok(VideoInfo {
                duration: self.frame_count as f64 / 25.0,
                width: 16,
                height: 8,
                fps: 25.0,
                frame_count: self.frame_count,
                codec: "h264".to_string(),
            })
        }

        async fn decode_frame(
            &self,
            _path: &Path,
            _info: &VideoInfo,
            index: u64,
        ) -> MediaResult<DynamicImage> {
            if self.broken_frames.contains(&index) {
                return Err(MediaError::frame_decode(index, "corrupt packet"));
            }
            self.decoded.lock().unwrap().push(index);
            let shade = (index % 256) as u8;
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 8, Rgb([shade, shade, shade]))))
        }
    }

    fn sampler(decoder: Arc<FakeDecoder>, target_frames: usize) -> FrameSampler {
        let config = FrameSamplerConfig {
            target_frames,
            ..Default::default()
        };
        FrameSampler::new(config, decoder)
    }

    #[test]
    fn test_sample_indices_evenly_spaced() {
        assert_eq!(sample_indices(100, 5), vec![0, 24, 49, 74, 99]);
        assert_eq!(sample_indices(10, 10), (0..10).collect::<Vec<_>>());
        assert_eq!(sample_indices(300, 2), vec![0, 299]);
    }

    #[test]
    fn test_sample_indices_caps_to_frame_count() {
        assert_eq!(sample_indices(3, 10), vec![0, 1, 2]);
        assert_eq!(sample_indices(1, 10), vec![0]);
        assert!(sample_indices(0, 10).is_empty());
        assert_eq!(sample_indices(500, 1), vec![0]);
    }

    #[test]
    fn test_sample_indices_huge_total() {
        let indices = sample_indices(u64::MAX, 10);
        assert_eq!(indices.len(), 10);
        assert_eq!(indices[0], 0);
        assert_eq!(indices[9], u64::MAX - 1);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sample_indices_ascending() {
        for total in 1..60u64 {
            for target in 1..15usize {
                let indices = sample_indices(total, target);
                assert_eq!(indices.len() as u64, (target as u64).min(total));
                assert!(indices.windows(2).all(|w| w[0] < w[1]));
                assert!(indices.iter().all(|&i| i < total));
            }
        }
    }

    #[test]
    fn test_video_extension() {
        assert_eq!(video_extension("video/webm"), "webm");
        assert_eq!(video_extension("video/mp4"), "mp4");
        assert_eq!(video_extension("video/unknown"), "mp4");
    }

    #[tokio::test]
    async fn test_sample_returns_target_frames() {
        let decoder = Arc::new(FakeDecoder::with_frames(250));
        let frames = assert_ok!(sampler(decoder.clone(), 10).sample(b"video", "video/mp4").await);

        let indices: Vec<u64> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, sample_indices(250, 10));
        assert_eq!(*decoder.decoded.lock().unwrap(), indices);

        for frame in &frames {
            let decoded = image::load_from_memory_with_format(&frame.data, ImageFormat::Jpeg).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (16, 8));
        }
    }

    #[tokio::test]
    async fn test_sample_short_video_returns_every_frame() {
        let decoder = Arc::new(FakeDecoder::with_frames(4));
        let frames = sampler(decoder, 10).sample(b"video", "video/mp4").await.unwrap();
        let indices: Vec<u64> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_sample_skips_broken_frames() {
        let decoder = Arc::new(FakeDecoder {
            frame_count: 10,
            broken_frames: [3, 7].into_iter().collect(),
            ..Default::default()
        });
        let frames = sampler(decoder, 10).sample(b"video", "video/mp4").await.unwrap();
        let indices: Vec<u64> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 4, 5, 6, 8, 9]);
    }

    #[tokio::test]
    async fn test_sample_unreadable_video() {
        let decoder = Arc::new(FakeDecoder {
            unreadable: true,
            ..Default::default()
        });
        let err = sampler(decoder.clone(), 10)
            .sample(b"not a video", "video/mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::UnreadableVideo(_)));
        assert!(err.is_client_error());
        assert!(decoder.decoded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sample_missing_tool_is_not_client_error() {
        let decoder = Arc::new(FakeDecoder {
            missing_tool: true,
            ..Default::default()
        });
        let err = assert_err!(sampler(decoder, 10).sample(b"video", "video/mp4").await);
        assert!(matches!(err, MediaError::FfprobeNotFound));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_sample_spawn_failure_is_not_client_error() {
        let decoder = Arc::new(FakeDecoder {
            spawn_fails: true,
            ..Default::default()
        });
        let err = assert_err!(sampler(decoder, 10).sample(b"video", "video/mp4").await);
        assert!(matches!(err, MediaError::Io(_)));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_sample_no_frames() {
        let decoder = Arc::new(FakeDecoder {
            frame_count: 2,
            broken_frames: [0, 1].into_iter().collect(),
            ..Default::default()
        });
        let err = assert_err!(sampler(decoder, 10).sample(b"video", "video/mp4").await);
        assert!(matches!(err, MediaError::NoFramesExtracted));

        let empty = Arc::new(FakeDecoder::with_frames(0));
        let err = sampler(empty, 10).sample(b"video", "video/mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::NoFramesExtracted));
    }

    #[tokio::test]
    async fn test_temp_file_removed_on_every_path() {
        let ok = Arc::new(FakeDecoder::with_frames(5));
        sampler(ok.clone(), 3).sample(b"video", "video/webm").await.unwrap();

        let unreadable = Arc::new(FakeDecoder {
            unreadable: true,
            ..Default::default()
        });
        let _ = sampler(unreadable.clone(), 3).sample(b"video", "video/mp4").await;

        let no_frames = Arc::new(FakeDecoder::with_frames(0));
        let _ = sampler(no_frames.clone(), 3).sample(b"video", "video/mp4").await;

        for decoder in [ok, unreadable, no_frames] {
            let paths = decoder.paths.lock().unwrap();
            assert_eq!(paths.len(), 1);
            assert!(!paths[0].exists(), "temp file {} was left behind", paths[0].display());
        }
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg and ffprobe in PATH"]
    async fn test_ffmpeg_rejects_garbage() {
        let sampler = FrameSampler::with_ffmpeg(FrameSamplerConfig::default());
        let err = sampler
            .sample(b"definitely not an mp4 container", "video/mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::UnreadableVideo(_)));
    }
}
