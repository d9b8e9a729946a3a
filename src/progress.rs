//! Progress reporting.
//!
//! The pipeline reports through the [`ProgressCallback`] trait. Any
//! `Fn(&ProgressUpdate)` closure is a callback, and [`Progress`] renders the
//! same updates as indicatif bars for the command line.
//!
//! Percentages are cumulative over the whole run: each enabled pass owns an
//! equal band of 0..=100 (the last band absorbs rounding), so 100% is only
//! reported once the last enabled pass has finished. A pass with no files,
//! or one cut short by a stop request, reports its band complete with an
//! empty `current_file`.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;

/// A unit of pipeline work that reports progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Directory walking
    Discovery,
    /// Byte-identical hashing
    Exact,
    /// Perceptual image hashing
    Image,
    /// Video signature sampling
    Video,
}

impl Stage {
    /// Short lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Exact => "exact",
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Discovery => "Discovering media",
            Self::Exact => "Hashing",
            Self::Image => "Comparing images",
            Self::Video => "Sampling videos",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One progress report from a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    /// Cumulative percentage over all enabled passes (0..=100)
    pub percent: u8,
    /// File the worker just finished
    pub current_file: String,
    /// Files finished so far in this pass
    pub files_processed: usize,
    /// Files dispatched to this pass
    pub total_files: usize,
    /// Pass that produced the update
    pub stage: Stage,
}

/// Receives progress from the pipeline.
///
/// Called from worker threads. Progress updates within a pass are
/// delivered one at a time, in `files_processed` order.
pub trait ProgressCallback: Send + Sync {
    /// A pass is starting with `total` files.
    fn on_stage_start(&self, _stage: Stage, _total: usize) {}

    /// A worker finished one file, or the pass ended early.
    fn on_progress(&self, update: &ProgressUpdate);

    /// A pass finished or was cut short by a stop request.
    fn on_stage_end(&self, _stage: Stage) {}

    /// Discovery found its `found`-th media file.
    fn on_discovered(&self, _found: usize, _path: &Path) {}
}

impl<F> ProgressCallback for F
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn on_progress(&self, update: &ProgressUpdate) {
        self(update);
    }
}

/// Cumulative percentage for `processed` of `total` files in band
/// `band` of `bands` equal bands.
///
/// An empty pass counts as complete.
#[must_use]
pub fn band_percent(band: usize, bands: usize, processed: usize, total: usize) -> u8 {
    if bands == 0 {
        return 100;
    }
    let band = band.min(bands - 1);
    let width = 100 / bands;
    let start = band * width;
    let span = if band + 1 == bands { 100 - start } else { width };

    let done = if total == 0 {
        span
    } else {
        span * processed.min(total) / total
    };
    u8::try_from(start + done).unwrap_or(100)
}

/// Terminal progress bars using indicatif.
pub struct Progress {
    multi: MultiProgress,
    discovery: Mutex<Option<ProgressBar>>,
    current: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use mediadupe::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            discovery: Mutex::new(None),
            current: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}% overall {prefix}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

impl ProgressCallback for Progress {
    fn on_stage_start(&self, stage: Stage, total: usize) {
        if self.quiet {
            return;
        }

        if stage == Stage::Discovery {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::spinner_style());
            pb.set_message(stage.label());
            pb.enable_steady_tick(Duration::from_millis(100));
            if let Ok(mut slot) = self.discovery.lock() {
                *slot = Some(pb);
            }
            return;
        }

        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(Self::bar_style());
        pb.set_message(stage.label());
        if let Ok(mut slot) = self.current.lock() {
            *slot = Some(pb);
        }
    }

    fn on_progress(&self, update: &ProgressUpdate) {
        if self.quiet {
            return;
        }

        if let Ok(slot) = self.current.lock() {
            if let Some(pb) = slot.as_ref() {
                pb.set_position(update.files_processed as u64);
                pb.set_prefix(format!("{}%", update.percent));
                pb.set_message(truncate_path(&update.current_file, 30));
            }
        }
    }

    fn on_stage_end(&self, stage: Stage) {
        if self.quiet {
            return;
        }

        let slot = if stage == Stage::Discovery {
            &self.discovery
        } else {
            &self.current
        };
        if let Some(pb) = slot.lock().ok().and_then(|mut s| s.take()) {
            pb.finish_with_message(format!("{} complete", stage.label()));
        }
    }

    fn on_discovered(&self, found: usize, _path: &Path) {
        if self.quiet {
            return;
        }

        if let Ok(slot) = self.discovery.lock() {
            if let Some(pb) = slot.as_ref() {
                pb.set_position(found as u64);
            }
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len >= max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
