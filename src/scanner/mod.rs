//! Scanner module for media discovery and per-file analysis.
//!
//! This module provides functionality for:
//! - Parallel directory walking using jwalk, filtered to supported media
//! - Exact content hashing with SHA-256 (streaming)
//! - Perceptual image fingerprints (average, difference, DCT and wavelet hashes)
//! - Video content signatures built from sampled frames under a time budget
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and media file discovery
//! - [`hasher`]: SHA-256 file hashing for byte-identical matching
//! - [`perceptual`]: Multi-hash perceptual image fingerprints
//! - [`video`]: Sampled-frame video signatures
//! - [`ffmpeg`]: `ffprobe`/`ffmpeg` backed [`FrameSource`]
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod ffmpeg;
pub mod hasher;
pub mod perceptual;
pub mod video;
pub mod walker;

use std::path::{Path, PathBuf};

use serde::Serialize;

// Re-export main types
pub use ffmpeg::{FfmpegConfig, FfmpegFrameSource};
pub use hasher::{ExactHasher, CHUNK_SIZE};
pub use perceptual::{ImageAnalyzer, PerceptualError, PerceptualHashRecord, HASH_BITS};
pub use video::{
    FrameError, FrameSource, VideoAnalyzer, VideoConfig, VideoMetadata, VideoSignature,
};
pub use walker::Walker;

/// Image extensions recognised by discovery (lowercase, without the dot).
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp", "heic", "heif",
];

/// Video extensions recognised by discovery (lowercase, without the dot).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v"];

/// Broad media category of a discovered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image, eligible for the perceptual image pass.
    Image,
    /// Video, eligible for the video signature pass.
    Video,
}

impl MediaKind {
    /// Classify a lowercase extension (without the leading dot).
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        if IMAGE_EXTENSIONS.contains(&extension) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&extension) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// Lowercase extension of `path`, or an empty string when it has none.
#[must_use]
pub fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// A media file found during discovery.
///
/// Created once by the walker and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaFile {
    /// Path to the file as discovered
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Lowercase extension without the dot (e.g. `"jpg"`)
    pub extension: String,
    /// Image or video
    pub kind: MediaKind,
}

impl MediaFile {
    /// Create a new MediaFile.
    ///
    /// Returns `None` when the extension is not a supported media type.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file
    /// * `size` - File size in bytes
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Option<Self> {
        let extension = lowercase_extension(&path);
        let kind = MediaKind::from_extension(&extension)?;
        Some(Self {
            path,
            size,
            extension,
            kind,
        })
    }

    /// Whether this file takes part in the perceptual image pass.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }

    /// Whether this file takes part in the video signature pass.
    #[must_use]
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }
}

/// Why a file produced no result in a pass.
///
/// Exclusion is not an error: the file simply takes no part in that pass and
/// the scan carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// The file could not be opened or read.
    Unreadable,
    /// The content could not be decoded as an image or video.
    DecodeFailed,
    /// The file is smaller than the video size floor.
    BelowSizeFloor,
    /// Reported fps, frame count or dimensions were not strictly positive.
    InvalidMetadata,
    /// Fewer than two sampled frames decoded.
    TooFewFrames,
    /// The per-file time budget ran out.
    TimedOut,
    /// An external decoding tool could not be started.
    ToolUnavailable,
    /// The analyzer panicked on this file.
    Panicked,
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Unreadable => "unreadable",
            Self::DecodeFailed => "decode failed",
            Self::BelowSizeFloor => "below size floor",
            Self::InvalidMetadata => "invalid metadata",
            Self::TooFewFrames => "too few frames",
            Self::TimedOut => "timed out",
            Self::ToolUnavailable => "decoder unavailable",
            Self::Panicked => "analyzer panicked",
        };
        f.write_str(text)
    }
}

/// Configuration for directory walking.
///
/// Controls symlink handling and hidden-file filtering.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during exact file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
