//! [`FrameSource`] backed by the `ffprobe` and `ffmpeg` executables.
//!
//! Metadata comes from `ffprobe -print_format json`; each sampled frame is a
//! separate `ffmpeg` run that seeks to the frame's timestamp and writes one
//! PNG to stdout. Every child process is polled against the caller's
//! deadline and killed once it passes.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use image::DynamicImage;
use serde::Deserialize;

use super::video::{FrameError, FrameSource, VideoMetadata};

/// How often a running child is checked for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Locations of the decoder executables.
#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    /// `ffmpeg` executable (looked up on `PATH` when relative)
    pub ffmpeg: PathBuf,
    /// `ffprobe` executable (looked up on `PATH` when relative)
    pub ffprobe: PathBuf,
    /// Side of the square frame ffmpeg scales to before piping it back
    pub frame_side: u32,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            frame_side: 64,
        }
    }
}

/// Frame source that shells out to ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegFrameSource {
    config: FfmpegConfig,
}

impl FfmpegFrameSource {
    /// Create a source using the given executables.
    #[must_use]
    pub fn new(config: FfmpegConfig) -> Self {
        Self { config }
    }
}

impl FrameSource for FfmpegFrameSource {
    /// Whether `ffprobe -version` runs successfully.
    fn is_available(&self) -> bool {
        Command::new(&self.config.ffprobe)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    fn probe(&self, path: &Path, deadline: Instant) -> Result<VideoMetadata, FrameError> {
        let mut cmd = Command::new(&self.config.ffprobe);
        cmd.args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            "-select_streams",
            "v:0",
        ])
        .arg(path);

        let output = run_until(&mut cmd, deadline).map_err(|e| match e {
            RunError::Frame(e) => e,
            RunError::Status(code) => FrameError::Probe {
                path: path.display().to_string(),
                message: format!("ffprobe exited with {code}"),
            },
        })?;

        let text = String::from_utf8_lossy(&output);
        metadata_from_probe(&text).map_err(|message| FrameError::Probe {
            path: path.display().to_string(),
            message,
        })
    }

    fn read_frame(
        &self,
        path: &Path,
        metadata: &VideoMetadata,
        index: u64,
        deadline: Instant,
    ) -> Result<DynamicImage, FrameError> {
        let timestamp = index as f64 / metadata.fps;
        let side = self.config.frame_side;

        let mut cmd = Command::new(&self.config.ffmpeg);
        cmd.args(["-v", "error", "-nostdin", "-ss"])
            .arg(format!("{timestamp:.3}"))
            .arg("-i")
            .arg(path)
            .args(["-frames:v", "1", "-an", "-sn", "-dn", "-vf"])
            .arg(format!("scale={side}:{side}"))
            .args(["-f", "image2pipe", "-vcodec", "png", "-"]);

        let bytes = run_until(&mut cmd, deadline).map_err(|e| match e {
            RunError::Frame(e) => e,
            RunError::Status(code) => FrameError::Decode {
                index,
                message: format!("ffmpeg exited with {code}"),
            },
        })?;

        if bytes.is_empty() {
            return Err(FrameError::Decode {
                index,
                message: "no frame at timestamp".to_string(),
            });
        }

        image::load_from_memory(&bytes).map_err(|e| FrameError::Decode {
            index,
            message: e.to_string(),
        })
    }
}

/// Why a child process run produced no usable output.
#[derive(Debug)]
enum RunError {
    Frame(FrameError),
    Status(String),
}

/// Run `cmd` to completion, returning its stdout.
///
/// The child is killed once `deadline` passes. Stdout is drained on a helper
/// thread so a chatty child cannot block on a full pipe.
fn run_until(cmd: &mut Command, deadline: Instant) -> Result<Vec<u8>, RunError> {
    if Instant::now() >= deadline {
        return Err(RunError::Frame(FrameError::TimedOut));
    }

    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                RunError::Frame(FrameError::ToolMissing(program.clone()))
            }
            _ => RunError::Frame(FrameError::Io(e)),
        })?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| RunError::Frame(FrameError::Io(std::io::Error::other("no stdout"))))?;
    let reader = std::thread::spawn(move || {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).map(|_| buf)
    });

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let output = reader
                    .join()
                    .map_err(|_| {
                        RunError::Frame(FrameError::Io(std::io::Error::other(
                            "stdout reader panicked",
                        )))
                    })?
                    .map_err(|e| RunError::Frame(FrameError::Io(e)))?;
                if !status.success() {
                    return Err(RunError::Status(status.to_string()));
                }
                return Ok(output);
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    log::trace!("Killing {program}: deadline passed");
                    reap(&mut child, reader);
                    return Err(RunError::Frame(FrameError::TimedOut));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                reap(&mut child, reader);
                return Err(RunError::Frame(FrameError::Io(e)));
            }
        }
    }
}

/// Kill `child`, wait for it and join its stdout reader.
fn reap(child: &mut Child, reader: JoinHandle<std::io::Result<Vec<u8>>>) {
    let _ = child.kill();
    let _ = child.wait();
    // The pipe closes with the child, so the reader finishes
    let _ = reader.join();
}

#[derive(Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
    streams: Option<Vec<ProbeStream>>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// Turn ffprobe JSON into [`VideoMetadata`].
///
/// Missing values become zero rather than errors so the analyzer can reject
/// them uniformly as invalid metadata. The frame count falls back to
/// `duration * fps` when the container does not record it.
fn metadata_from_probe(json: &str) -> Result<VideoMetadata, String> {
    let probe: ProbeOutput =
        serde_json::from_str(json).map_err(|e| format!("unreadable ffprobe output: {e}"))?;

    let stream = probe
        .streams
        .as_ref()
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.codec_type.as_deref() == Some("video"))
        })
        .ok_or_else(|| "no video stream".to_string())?;

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .filter(|f| *f > 0.0)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(0.0);

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(stream.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or_else(|| duration.map_or(0, |d| (d * fps).round() as u64));

    let duration = duration.unwrap_or_else(|| {
        if fps > 0.0 {
            frame_count as f64 / fps
        } else {
            0.0
        }
    });

    Ok(VideoMetadata {
        fps,
        frame_count,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        duration,
    })
}

/// Parse an ffprobe rate such as `"30/1"`, `"30000/1001"` or `"29.97"`.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    if let Some((num_str, den_str)) = rate.split_once('/') {
        let num: f64 = num_str.parse().ok()?;
        let den: f64 = den_str.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate.parse().ok()
}
