//! mediadupe - duplicate and near-duplicate media finder
//!
//! Finds byte-identical files, perceptually similar images, and videos with
//! matching sampled-frame signatures, then merges the three result sets so
//! each file lands in at most one group.
//!
//! # Library use
//!
//! ```no_run
//! use mediadupe::config::ScanOptions;
//! use mediadupe::duplicates::DuplicateFinder;
//!
//! let options = ScanOptions {
//!     similar_images: true,
//!     ..ScanOptions::default()
//! };
//! let mut finder = DuplicateFinder::new(options).unwrap();
//! finder.scan(&["/photos"]).unwrap();
//! for group in finder.find_duplicates().unwrap() {
//!     println!("{} {:?}", group.kind, group.paths().collect::<Vec<_>>());
//! }
//! ```

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};

use cli::{Cli, Commands, OutputFormat, ScanArgs};
use config::ScanOptions;
use duplicates::DuplicateFinder;
use error::ExitCode;
use output::{CsvOutput, JsonOutput, TextOutput};
use progress::Progress;
use scanner::{FfmpegConfig, FfmpegFrameSource, VideoConfig, WalkerConfig};

/// Run the command described by `cli`.
///
/// Interrupted scans still print their partial results and return
/// [`ExitCode::Interrupted`].
///
/// # Errors
///
/// Returns an error for invalid options, invalid roots, or output failures.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Scan(args) => run_scan(args, cli.quiet),
    }
}

/// Merge an optional options file with command-line overrides.
///
/// # Errors
///
/// Returns an error if the options file cannot be read or parsed.
pub fn resolve_options(args: &ScanArgs) -> Result<ScanOptions> {
    let mut options = match &args.options {
        Some(path) => ScanOptions::from_file(path)
            .with_context(|| format!("Cannot load options from {}", path.display()))?,
        None => ScanOptions::default(),
    };

    if args.no_exact {
        options.exact_match = false;
    }
    if args.similar_images {
        options.similar_images = true;
    }
    if args.similar_videos {
        options.similar_videos = true;
    }
    if let Some(threshold) = args.threshold {
        options.similarity_threshold = threshold;
    }
    if let Some(threads) = args.threads {
        options.thread_count = threads;
    }
    Ok(options)
}

fn run_scan(args: ScanArgs, quiet: bool) -> Result<ExitCode> {
    let options = resolve_options(&args)?;
    log::debug!("Scan options: {options:?}");

    let stop = signal::install_handler()?;

    let frame_source = FfmpegFrameSource::new(FfmpegConfig {
        ffmpeg: args.ffmpeg.clone(),
        ffprobe: args.ffprobe.clone(),
        ..FfmpegConfig::default()
    });
    let video_config = VideoConfig {
        time_budget: args.video_timeout,
        ..VideoConfig::default()
    };
    let walker_config = WalkerConfig {
        follow_symlinks: args.follow_symlinks,
        skip_hidden: args.skip_hidden,
    };

    let mut finder = DuplicateFinder::new(options)
        .context("Invalid scan options")?
        .with_walker_config(walker_config)
        .with_video_config(video_config)
        .with_frame_source(Arc::new(frame_source))
        .with_stop_signal(stop)
        .with_progress_callback(Arc::new(Progress::new(quiet)));

    finder.scan(&args.paths).context("Scan failed")?;
    let (groups, summary) = finder.find_duplicates_with_summary()?;

    if summary.interrupted {
        log::warn!("Scan interrupted; reporting partial results");
    }
    let exit_code = ExitCode::for_run(summary.interrupted, groups.len());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => TextOutput::new(&groups, &summary).write_to(&mut out)?,
        OutputFormat::Json => {
            JsonOutput::new(&groups, &summary, exit_code).write_to(&mut out, args.pretty)?;
        }
        OutputFormat::Csv => CsvOutput::new(&groups).write_to(&mut out)?,
    }
    out.flush()?;

    Ok(exit_code)
}
