//! Sampled-frame video signatures.
//!
//! # Overview
//!
//! A [`VideoSignature`] is an ordered list of per-frame fingerprints taken at
//! evenly spaced positions across the video, plus the metadata needed to
//! compare two videos. Decoding is delegated to a [`FrameSource`] so the
//! sampling logic stays independent of any particular decoder; the default
//! source shells out to `ffprobe`/`ffmpeg` (see [`super::ffmpeg`]).
//!
//! Analysis of one file is bounded by [`VideoConfig::time_budget`]. Running
//! out of time discards whatever was sampled so far.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::imageops::FilterType;
use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;

use super::{ExclusionReason, MediaFile};

/// Errors a [`FrameSource`] can report.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The decoder executable could not be started.
    #[error("Decoder not available: {0}")]
    ToolMissing(String),

    /// Container or stream metadata could not be read.
    #[error("Probe failed for {path}: {message}")]
    Probe {
        /// File being probed
        path: String,
        /// What went wrong
        message: String,
    },

    /// A single frame could not be decoded.
    #[error("Frame {index} could not be decoded: {message}")]
    Decode {
        /// Requested frame index
        index: u64,
        /// What went wrong
        message: String,
    },

    /// The deadline passed while waiting on the decoder.
    #[error("Deadline exceeded")]
    TimedOut,

    /// Any other I/O failure talking to the decoder.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Exclusion recorded when this error ends analysis of a file.
    #[must_use]
    pub fn exclusion(&self) -> ExclusionReason {
        match self {
            Self::ToolMissing(_) => ExclusionReason::ToolUnavailable,
            Self::TimedOut => ExclusionReason::TimedOut,
            Self::Probe { .. } | Self::Decode { .. } => ExclusionReason::DecodeFailed,
            Self::Io(_) => ExclusionReason::Unreadable,
        }
    }
}

/// Stream properties reported by a [`FrameSource`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoMetadata {
    /// Frames per second
    pub fps: f64,
    /// Total frame count
    pub frame_count: u64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Duration in seconds
    pub duration: f64,
}

impl VideoMetadata {
    /// Whether fps, frame count and both dimensions are strictly positive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.fps.is_finite()
            && self.fps > 0.0
            && self.frame_count > 0
            && self.width > 0
            && self.height > 0
    }
}

/// Decodes metadata and individual frames for the video analyzer.
///
/// Implementations must honour `deadline`: once it passes they should stop
/// waiting and return [`FrameError::TimedOut`].
pub trait FrameSource: Send + Sync {
    /// Read stream metadata.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if the file cannot be probed.
    fn probe(&self, path: &Path, deadline: Instant) -> Result<VideoMetadata, FrameError>;

    /// Decode the frame at `index` (0-based).
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if the frame cannot be produced.
    fn read_frame(
        &self,
        path: &Path,
        metadata: &VideoMetadata,
        index: u64,
        deadline: Instant,
    ) -> Result<DynamicImage, FrameError>;

    /// Whether the backing decoder can run at all.
    fn is_available(&self) -> bool {
        true
    }
}

/// Tunables for video analysis.
#[derive(Debug, Clone)]
pub struct VideoConfig {
    /// Wall-clock budget for a single file
    pub time_budget: Duration,
    /// Files smaller than this many bytes are excluded
    pub min_file_size: u64,
    /// Never sample fewer frames than this
    pub min_samples: usize,
    /// Never sample more frames than this
    pub max_samples: usize,
    /// One sample per this many frames, before clamping
    pub frames_per_sample: u64,
    /// Side of the grayscale thumbnail each frame is reduced to
    pub thumbnail_side: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(5),
            min_file_size: 500,
            min_samples: 3,
            max_samples: 10,
            frames_per_sample: 30,
            thumbnail_side: 16,
        }
    }
}

/// Relative duration difference above which similarity is penalised.
const DURATION_TOLERANCE: f64 = 0.05;

/// Multiplier applied to similarity when durations disagree.
const DURATION_PENALTY: f64 = 0.8;

/// Sampled-frame fingerprint of one video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSignature {
    /// Frame fingerprints in sampling order
    pub frame_hashes: Vec<u64>,
    /// Duration in seconds
    pub duration: f64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frames per second
    pub fps: f64,
    /// Total frame count
    pub frame_count: u64,
}

impl VideoSignature {
    /// `"WxH"` string for display.
    #[must_use]
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// First frame fingerprint as 16 hex digits.
    #[must_use]
    pub fn preview(&self) -> String {
        self.frame_hashes
            .first()
            .map(|h| format!("{h:016x}"))
            .unwrap_or_default()
    }

    /// Similarity in percent.
    ///
    /// Frames are matched by position over the shorter signature. When both
    /// durations are known and differ by more than 5% of the longer one the
    /// score is scaled by 0.8.
    #[must_use]
    pub fn similarity(&self, other: &Self) -> f64 {
        let len = self.frame_hashes.len().min(other.frame_hashes.len());
        if len == 0 {
            return 0.0;
        }

        let matches = self
            .frame_hashes
            .iter()
            .zip(&other.frame_hashes)
            .filter(|(a, b)| a == b)
            .count();
        let mut score = matches as f64 / len as f64 * 100.0;

        if self.duration > 0.0 && other.duration > 0.0 {
            let longer = self.duration.max(other.duration);
            if (self.duration - other.duration).abs() / longer > DURATION_TOLERANCE {
                score *= DURATION_PENALTY;
            }
        }

        score
    }
}

/// Builds and compares [`VideoSignature`]s.
pub struct VideoAnalyzer {
    config: VideoConfig,
    source: Arc<dyn FrameSource>,
}

impl std::fmt::Debug for VideoAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoAnalyzer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VideoAnalyzer {
    /// Create an analyzer over the given frame source.
    #[must_use]
    pub fn new(config: VideoConfig, source: Arc<dyn FrameSource>) -> Self {
        Self { config, source }
    }

    /// Number of frames to sample from a video with `frame_count` frames.
    #[must_use]
    pub fn sample_count(&self, frame_count: u64) -> usize {
        let per = self.config.frames_per_sample.max(1);
        let wanted = usize::try_from(frame_count / per).unwrap_or(usize::MAX);
        wanted.clamp(
            self.config.min_samples,
            self.config.max_samples.max(self.config.min_samples),
        )
    }

    /// Build the signature for `file`.
    ///
    /// # Errors
    ///
    /// Returns the [`ExclusionReason`] when the file cannot take part in the
    /// video pass: too small, bad metadata, decoder failure, fewer than two
    /// decoded frames, or an exhausted time budget.
    pub fn analyze(&self, file: &MediaFile) -> Result<VideoSignature, ExclusionReason> {
        if file.size < self.config.min_file_size {
            log::debug!(
                "Skipping {} ({} bytes, below video floor)",
                file.path.display(),
                file.size
            );
            return Err(ExclusionReason::BelowSizeFloor);
        }

        let deadline = Instant::now() + self.config.time_budget;

        let metadata = self.source.probe(&file.path, deadline).map_err(|e| {
            log::debug!("Probe failed for {}: {}", file.path.display(), e);
            e.exclusion()
        })?;

        if !metadata.is_valid() {
            log::debug!(
                "Invalid video metadata for {}: {:?}",
                file.path.display(),
                metadata
            );
            return Err(ExclusionReason::InvalidMetadata);
        }

        let samples = self.sample_count(metadata.frame_count);
        let indices = sample_indices(metadata.frame_count, samples);
        let mut frame_hashes = Vec::with_capacity(indices.len());

        for index in indices {
            if Instant::now() >= deadline {
                log::debug!("Time budget exhausted for {}", file.path.display());
                return Err(ExclusionReason::TimedOut);
            }

            match self.source.read_frame(&file.path, &metadata, index, deadline) {
                Ok(frame) => frame_hashes.push(frame_hash(&frame, self.config.thumbnail_side)),
                Err(FrameError::TimedOut) => {
                    log::debug!("Time budget exhausted for {}", file.path.display());
                    return Err(ExclusionReason::TimedOut);
                }
                Err(FrameError::ToolMissing(tool)) => {
                    log::debug!("Decoder {tool} disappeared during sampling");
                    return Err(ExclusionReason::ToolUnavailable);
                }
                Err(e) => {
                    log::trace!("Skipping frame of {}: {}", file.path.display(), e);
                }
            }
        }

        if Instant::now() > deadline {
            log::debug!("Time budget exhausted for {}", file.path.display());
            return Err(ExclusionReason::TimedOut);
        }

        if frame_hashes.len() < 2 {
            return Err(ExclusionReason::TooFewFrames);
        }

        Ok(VideoSignature {
            frame_hashes,
            duration: metadata.duration,
            width: metadata.width,
            height: metadata.height,
            fps: metadata.fps,
            frame_count: metadata.frame_count,
        })
    }

    /// Whether two signatures are at least `threshold` percent similar.
    #[must_use]
    pub fn compare(&self, a: &VideoSignature, b: &VideoSignature, threshold: u8) -> bool {
        if a.frame_hashes.is_empty() || b.frame_hashes.is_empty() {
            return false;
        }
        a.similarity(b) >= f64::from(threshold)
    }
}

/// `count` evenly spaced indices over `[0, frame_count - 1]`, endpoints included.
#[must_use]
pub fn sample_indices(frame_count: u64, count: usize) -> Vec<u64> {
    if frame_count == 0 || count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![0];
    }

    let last = frame_count - 1;
    let steps = (count - 1) as u64;
    let mut indices: Vec<u64> = (0..count as u64)
        .map(|i| ((u128::from(i) * u128::from(last)) / u128::from(steps)) as u64)
        .collect();
    // Short videos would otherwise revisit the same frame
    indices.dedup();
    indices
}

/// Fingerprint of one frame: a small grayscale thumbnail hashed with xxh3.
#[must_use]
pub fn frame_hash(frame: &DynamicImage, side: u32) -> u64 {
    let thumb = image::imageops::resize(&frame.to_luma8(), side, side, FilterType::Triangle);
    twox_hash::xxh3::hash64(thumb.as_raw())
}
