//! Media error types.

use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg is not installed")]
    FfmpegNotFound,

    #[error("ffprobe is not installed")]
    FfprobeNotFound,

    #[error("{message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("{message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("No such file: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Decoder process exceeded its time budget, in seconds.
    #[error("Decoding timed out after {0}s")]
    Timeout(u64),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Malformed ffprobe output: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Not a video: {0}")]
    InvalidVideo(String),

    /// The upload could not be opened as a video container.
    #[error("Could not open video file: {0}")]
    UnreadableVideo(String),

    #[error("Failed to extract frames from video")]
    NoFramesExtracted,

    #[error("Frame {index} could not be decoded: {message}")]
    FrameDecode { index: u64, message: String },
}

impl MediaError {
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn frame_decode(index: u64, message: impl Into<String>) -> Self {
        Self::FrameDecode {
            index,
            message: message.into(),
        }
    }

    /// The upload itself is at fault, not the host.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnreadableVideo(_) | Self::NoFramesExtracted | Self::InvalidVideo(_)
        )
    }

    pub fn is_missing_tool(&self) -> bool {
        matches!(self, Self::FfmpegNotFound | Self::FfprobeNotFound)
    }

    /// The host could not run the tooling, whatever the upload contains.
    pub fn is_host_error(&self) -> bool {
        self.is_missing_tool() || matches!(self, Self::Io(_))
    }
}
