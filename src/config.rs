//! Scan configuration.
//!
//! [`ScanOptions`] selects which passes run and how strict similarity
//! matching is. It deserializes from JSON with every field defaulted, so a
//! caller can hand over a partial settings object; keys the engine does not
//! use (such as the display filters `diff_resolution` and `diff_format`)
//! are ignored.

use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Accepted similarity thresholds, in percent.
pub const THRESHOLD_RANGE: RangeInclusive<u8> = 50..=100;

/// Errors raised when options are rejected before a scan starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Threshold outside [`THRESHOLD_RANGE`].
    #[error("Similarity threshold must be between 50 and 100, got {0}")]
    InvalidThreshold(i64),

    /// A pool needs at least one worker.
    #[error("Thread count must be at least 1")]
    InvalidThreadCount,

    /// The options file could not be read.
    #[error("Failed to read options from {path}: {source}")]
    Read {
        /// Options file path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The options text is not valid JSON for [`ScanOptions`].
    #[error("Invalid options: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Which passes to run and how strictly to match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Run the byte-identical pass
    pub exact_match: bool,
    /// Run the perceptual image pass
    pub similar_images: bool,
    /// Run the video signature pass
    pub similar_videos: bool,
    /// Minimum similarity in percent for the image and video passes
    pub similarity_threshold: i64,
    /// Worker threads per pass
    pub thread_count: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exact_match: true,
            similar_images: false,
            similar_videos: false,
            similarity_threshold: 90,
            thread_count: 4,
        }
    }
}

impl ScanOptions {
    /// Parse options from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or mistyped values.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read options from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Check ranges.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.threshold()?;
        if self.thread_count == 0 {
            return Err(ConfigError::InvalidThreadCount);
        }
        Ok(())
    }

    /// The threshold as a percentage, once validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidThreshold`] outside 50..=100.
    pub fn threshold(&self) -> Result<u8, ConfigError> {
        u8::try_from(self.similarity_threshold)
            .ok()
            .filter(|t| THRESHOLD_RANGE.contains(t))
            .ok_or(ConfigError::InvalidThreshold(self.similarity_threshold))
    }

    /// Whether at least one pass is enabled.
    #[must_use]
    pub fn any_pass_enabled(&self) -> bool {
        self.exact_match || self.similar_images || self.similar_videos
    }
}
