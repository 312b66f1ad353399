//! Video decoding backends.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};

/// Decoder able to inspect a video file and pull single frames out of it.
///
/// Implementations work on file paths because most decoders need
/// file-backed input.
#[async_trait]
pub trait VideoDecoder: Send + Sync {
    /// Inspect the container. Fails if the file cannot be opened as video.
    async fn probe(&self, path: &Path) -> MediaResult<VideoInfo>;

    /// Seek to `index` and decode exactly one frame.
    async fn decode_frame(
        &self,
        path: &Path,
        info: &VideoInfo,
        index: u64,
    ) -> MediaResult<DynamicImage>;
}

/// Decoder backed by the `ffprobe` and `ffmpeg` binaries.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    runner: FfmpegRunner,
}

impl FfmpegDecoder {
    pub fn new(decode_timeout: Duration) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(decode_timeout),
        }
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl VideoDecoder for FfmpegDecoder {
    async fn probe(&self, path: &Path) -> MediaResult<VideoInfo> {
        probe_video(path, self.runner.timeout()).await
    }

    async fn decode_frame(
        &self,
        path: &Path,
        info: &VideoInfo,
        index: u64,
    ) -> MediaResult<DynamicImage> {
        let cmd = FfmpegCommand::to_stdout(path)
            .seek(info.timestamp_of(index))
            .single_frame()
            .no_audio()
            .format("image2pipe")
            .video_codec("png");

        let png = self.runner.capture(&cmd).await?;

        // Seeking past the last decodable frame exits cleanly with no output
        if png.is_empty() {
            return Err(MediaError::frame_decode(index, "no frame at position"));
        }

        image::load_from_memory_with_format(&png, ImageFormat::Png)
            .map_err(|e| MediaError::frame_decode(index, e.to_string()))
    }
}
