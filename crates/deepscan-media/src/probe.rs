//! Stream inspection through `ffprobe`.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Frame rate assumed when the container reports none.
const FALLBACK_FPS: f64 = 30.0;

/// Only the first video stream and the fields we read are requested.
const PROBE_ARGS: &[&str] = &[
    "-v",
    "error",
    "-select_streams",
    "v:0",
    "-show_entries",
    "stream=codec_name,width,height,avg_frame_rate,r_frame_rate,nb_frames,duration:format=duration",
    "-of",
    "json",
];

/// What the sampler needs to know about a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Number of decodable frames
    pub frame_count: u64,
    pub codec: String,
}

impl VideoInfo {
    /// Presentation timestamp of a frame index, in seconds.
    pub fn timestamp_of(&self, index: u64) -> f64 {
        if self.fps > 0.0 {
            index as f64 / self.fps
        } else {
            0.0
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProbeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

impl ProbeStream {
    fn fps(&self) -> Option<f64> {
        [&self.avg_frame_rate, &self.r_frame_rate]
            .into_iter()
            .flatten()
            .find_map(|rate| parse_frame_rate(rate))
    }

    fn counted_frames(&self) -> Option<u64> {
        self.nb_frames
            .as_deref()
            .and_then(|n| n.parse::<u64>().ok())
            .filter(|&n| n > 0)
    }
}

/// Run `ffprobe` against a file on disk.
///
/// With a `timeout` the process is killed once it elapses.
pub async fn probe_video(
    path: impl AsRef<Path>,
    timeout: Option<Duration>,
) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let run = Command::new("ffprobe")
        .args(PROBE_ARGS)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match timeout {
        None => run.await?,
        Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
            warn!(timeout_secs = limit.as_secs(), "ffprobe timed out");
            MediaError::Timeout(limit.as_secs())
        })??,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = stderr
            .lines()
            .last()
            .map(str::to_string)
            .unwrap_or_else(|| format!("ffprobe exited with {}", output.status));
        return Err(MediaError::FfprobeFailed {
            message,
            stderr: (!stderr.is_empty()).then_some(stderr),
        });
    }

    let info = parse_probe_output(&output.stdout)?;
    debug!(?info, "ffprobe finished");
    Ok(info)
}

/// Build [`VideoInfo`] from ffprobe's JSON report.
///
/// Prefers the stream duration over the container's. When the stream has no
/// `nb_frames` the count is estimated as `round(duration * fps)`.
fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoInfo> {
    let report: ProbeReport = serde_json::from_slice(stdout)?;

    let stream = report
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::InvalidVideo("no video stream".to_string()))?;

    let container_duration = report.format.and_then(|f| f.duration);
    let duration = stream
        .duration
        .as_deref()
        .or(container_duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    let fps = stream.fps().unwrap_or(FALLBACK_FPS);
    let frame_count = stream
        .counted_frames()
        .unwrap_or_else(|| (duration * fps).round() as u64);

    Ok(VideoInfo {
        duration,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps,
        frame_count,
        codec: stream.codec_name.unwrap_or_default(),
    })
}

/// Accepts both rational ("30000/1001") and decimal ("29.97") rates.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}
