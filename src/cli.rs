//! Command-line interface definitions for mediadupe.
//!
//! # Example
//!
//! ```bash
//! # Byte-identical duplicates only (default)
//! mediadupe scan ~/Pictures
//!
//! # Add perceptual image and video matching at 85% similarity
//! mediadupe scan ~/Pictures ~/Videos --similar-images --similar-videos --threshold 85
//!
//! # Machine-readable output
//! mediadupe scan ~/Pictures --output json --json-errors
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Find duplicate and near-duplicate images and videos.
///
/// Runs up to three passes: byte-identical (SHA-256), perceptual image
/// similarity, and sampled video frame signatures. Results are merged so
/// each file appears in at most one group.
#[derive(Debug, Parser)]
#[command(name = "mediadupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress bars and all logging except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan directories for duplicate media
    Scan(ScanArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directories to scan (overlapping roots are scanned once)
    #[arg(value_name = "DIR", required = true)]
    pub paths: Vec<PathBuf>,

    /// Load scan options from a JSON file; flags below override it
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// Skip the byte-identical pass
    #[arg(long)]
    pub no_exact: bool,

    /// Run the perceptual image pass
    #[arg(long)]
    pub similar_images: bool,

    /// Run the video signature pass (needs ffmpeg and ffprobe)
    #[arg(long)]
    pub similar_videos: bool,

    /// Minimum similarity in percent for image and video matches (50-100)
    #[arg(short, long, value_name = "PERCENT", env = "MEDIADUPE_THRESHOLD")]
    pub threshold: Option<i64>,

    /// Worker threads per pass
    #[arg(short = 'j', long, value_name = "N", env = "MEDIADUPE_THREADS")]
    pub threads: Option<usize>,

    /// Per-video time budget in seconds
    #[arg(long, value_name = "SECS", default_value = "5", value_parser = parse_seconds)]
    pub video_timeout: std::time::Duration,

    /// ffmpeg executable
    #[arg(long, value_name = "PATH", env = "MEDIADUPE_FFMPEG", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// ffprobe executable
    #[arg(long, value_name = "PATH", env = "MEDIADUPE_FFPROBE", default_value = "ffprobe")]
    pub ffprobe: PathBuf,

    /// Follow symbolic links during scan
    ///
    /// Warning: May cause infinite loops if symlinks form cycles.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// JSON document
    Json,
    /// One CSV row per group member
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a positive number of seconds, fractions allowed.
///
/// # Errors
///
/// Returns an error message for non-numeric, zero, or negative input.
pub fn parse_seconds(s: &str) -> Result<std::time::Duration, String> {
    let s = s.trim();
    let secs: f64 = s
        .trim_end_matches('s')
        .parse()
        .map_err(|_| format!("Invalid number of seconds: '{s}'"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err("Timeout must be greater than zero".to_string());
    }
    Ok(std::time::Duration::from_secs_f64(secs))
}
