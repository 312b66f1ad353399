//! Building and running one-shot `ffmpeg` invocations.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Output target that streams encoded data to the runner's stdout.
pub const STDOUT_PIPE: &str = "pipe:1";

/// Argument list for a single `ffmpeg` call.
///
/// Options are split by position: input options go before `-i` (such as
/// `-ss` for fast seeking) and output options after it.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: String,
    before_input: Vec<String>,
    after_input: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl Into<String>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.into(),
            before_input: Vec::new(),
            after_input: Vec::new(),
        }
    }

    /// Write the encoded result to stdout instead of a file.
    pub fn to_stdout(input: impl AsRef<Path>) -> Self {
        Self::new(input, STDOUT_PIPE)
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.before_input.push(arg.into());
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.after_input.push(arg.into());
        self
    }

    /// Input seek, in seconds with millisecond precision.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{seconds:.3}"))
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn format(self, format: impl Into<String>) -> Self {
        self.output_arg("-f").output_arg(format)
    }

    /// Stop after the first decoded video frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Full argument vector, without the program name.
    pub fn build_args(&self) -> Vec<String> {
        let prelude = ["-y", "-nostdin", "-v", "error"].map(String::from);

        prelude
            .into_iter()
            .chain(self.before_input.iter().cloned())
            .chain(["-i".to_string(), self.input.to_string_lossy().into_owned()])
            .chain(self.after_input.iter().cloned())
            .chain(std::iter::once(self.output.clone()))
            .collect()
    }
}

/// Spawns `ffmpeg` and collects its stdout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the process if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `cmd` to completion and return its stdout.
    pub async fn capture(&self, cmd: &FfmpegCommand) -> MediaResult<Vec<u8>> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!(args = %args.join(" "), "Spawning ffmpeg");

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let waited = child.wait_with_output();
        let output = match self.timeout {
            None => waited.await?,
            Some(limit) => tokio::time::timeout(limit, waited).await.map_err(|_| {
                // kill_on_drop reaps the child once the future is dropped
                warn!(timeout_secs = limit.as_secs(), "ffmpeg timed out");
                MediaError::Timeout(limit.as_secs())
            })??,
        };

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(MediaError::ffmpeg_failed(
            format!("ffmpeg exited with {}", output.status),
            (!stderr.is_empty()).then_some(stderr),
            output.status.code(),
        ))
    }
}

pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_precedes_input() {
        let args = FfmpegCommand::to_stdout("input.mp4")
            .seek(1.5)
            .single_frame()
            .format("image2pipe")
            .video_codec("png")
            .build_args();

        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(args[ss + 1], "1.500");
        assert_eq!(args[input + 1], "input.mp4");
        assert!(args.contains(&"-frames:v".to_string()));
        assert!(args.contains(&"image2pipe".to_string()));
        assert_eq!(args.last().map(String::as_str), Some(STDOUT_PIPE));
        assert_eq!(&args[..4], ["-y", "-nostdin", "-v", "error"]);
    }

}
