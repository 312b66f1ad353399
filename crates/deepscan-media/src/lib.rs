//! FFmpeg CLI wrapper for video frame sampling.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - FFprobe stream inspection (frame count, fps, duration)
//! - Single-frame decoding at an arbitrary frame index
//! - Evenly spaced frame sampling from in-memory video bytes

pub mod command;
pub mod decoder;
pub mod error;
pub mod probe;
pub mod sampler;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use decoder::{FfmpegDecoder, VideoDecoder};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use sampler::{sample_indices, FrameSampler, FrameSamplerConfig};
