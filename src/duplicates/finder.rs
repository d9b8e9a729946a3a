//! Scan pipeline orchestration.
//!
//! # Overview
//!
//! [`DuplicateFinder`] owns the discovered file list and runs up to three
//! passes over it, always in the same order:
//!
//! 1. **Exact** - SHA-256 of every file, grouped by identical digest
//! 2. **Image** - perceptual fingerprints of images, greedy clustering
//! 3. **Video** - sampled-frame signatures of videos, greedy clustering
//!
//! Each pass runs on its own bounded rayon pool of `thread_count` threads.
//! Workers write one [`AnalysisOutcome`] per file into a concurrent map keyed
//! by path; grouping then walks the discovery-ordered file list, so output
//! does not depend on completion order. The pass groups are merged with
//! earlier passes winning any contested file.
//!
//! Per-file failures (including analyzer panics) become
//! [`AnalysisOutcome::Excluded`] at the worker boundary. A stop request
//! prevents new files from starting and the pipeline returns whatever
//! groups the finished files support.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rayon::prelude::*;

use super::groups::{cluster_similar, group_exact, merge_groups, DuplicateGroup, MatchKind};
use crate::config::{ConfigError, ScanOptions};
use crate::progress::{band_percent, ProgressCallback, ProgressUpdate, Stage};
use crate::scanner::{
    ExactHasher, ExclusionReason, FfmpegFrameSource, FrameSource, HashError, ImageAnalyzer,
    MediaFile, PerceptualError, PerceptualHashRecord, ScanError, VideoAnalyzer, VideoConfig,
    VideoSignature, Walker, WalkerConfig,
};
use crate::signal::StopSignal;

/// Result of analysing one file in one pass.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// SHA-256 hex digest
    Exact(String),
    /// Perceptual fingerprints
    Image(PerceptualHashRecord),
    /// Sampled-frame signature
    Video(VideoSignature),
    /// The file takes no part in this pass
    Excluded(ExclusionReason),
}

impl AnalysisOutcome {
    /// The exclusion reason, if this outcome is an exclusion.
    #[must_use]
    pub fn exclusion(&self) -> Option<ExclusionReason> {
        match self {
            Self::Excluded(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<HashError> for ExclusionReason {
    fn from(_: HashError) -> Self {
        Self::Unreadable
    }
}

impl From<PerceptualError> for ExclusionReason {
    fn from(error: PerceptualError) -> Self {
        match error {
            PerceptualError::Io(..) => Self::Unreadable,
            PerceptualError::LoadError(..) => Self::DecodeFailed,
        }
    }
}

/// Counters for one pass.
#[derive(Debug, Clone)]
pub struct StageSummary {
    /// Which pass
    pub stage: Stage,
    /// Files eligible for the pass
    pub dispatched: usize,
    /// Files that produced a result
    pub analyzed: usize,
    /// Files excluded, by reason
    pub exclusions: BTreeMap<ExclusionReason, usize>,
    /// Files never started because a stop was requested
    pub skipped: usize,
    /// Groups this pass produced before merging
    pub groups: usize,
    /// Wall-clock time of the pass
    pub duration: Duration,
}

impl StageSummary {
    fn new(stage: Stage, dispatched: usize) -> Self {
        Self {
            stage,
            dispatched,
            analyzed: 0,
            exclusions: BTreeMap::new(),
            skipped: 0,
            groups: 0,
            duration: Duration::ZERO,
        }
    }

    /// Total files excluded for any reason.
    #[must_use]
    pub fn excluded(&self) -> usize {
        self.exclusions.values().sum()
    }
}

/// Statistics for one `find_duplicates` run.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Files discovered
    pub total_files: usize,
    /// Bytes discovered
    pub total_size: u64,
    /// Entries the walker could not read
    pub walker_errors: usize,
    /// Per-pass counters, in run order
    pub stages: Vec<StageSummary>,
    /// Groups after merging
    pub duplicate_groups: usize,
    /// Files in merged groups, excluding each group's first member
    pub duplicate_files: usize,
    /// Bytes freed by keeping only each group's first member
    pub reclaimable_space: u64,
    /// Whether a stop was requested before the run finished
    pub interrupted: bool,
    /// Wall-clock time of the run
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Exclusion tallies summed over all passes.
    #[must_use]
    pub fn exclusions(&self) -> BTreeMap<ExclusionReason, usize> {
        let mut total = BTreeMap::new();
        for stage in &self.stages {
            for (reason, count) in &stage.exclusions {
                *total.entry(*reason).or_insert(0) += count;
            }
        }
        total
    }

    /// Reclaimable space as a human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        bytesize::ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Total size as a human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        bytesize::ByteSize::b(self.total_size).to_string()
    }
}

/// Errors that stop a scan before it starts.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// A root directory does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// A root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The scan options were rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A worker pool could not be created.
    #[error("Failed to create worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Any other root validation failure.
    #[error(transparent)]
    Scan(ScanError),
}

impl From<ScanError> for FinderError {
    fn from(error: ScanError) -> Self {
        match error {
            ScanError::NotFound(path) => Self::PathNotFound(path),
            ScanError::NotADirectory(path) => Self::NotADirectory(path),
            other => Self::Scan(other),
        }
    }
}

/// Per-pass result map after all workers have finished.
type Outcomes = HashMap<PathBuf, AnalysisOutcome>;

/// Duplicate finder that orchestrates discovery and the analysis passes.
///
/// # Example
///
/// ```no_run
/// use mediadupe::config::ScanOptions;
/// use mediadupe::duplicates::DuplicateFinder;
/// use std::path::PathBuf;
///
/// let options = ScanOptions {
///     similar_images: true,
///     ..Default::default()
/// };
/// let mut finder = DuplicateFinder::new(options).unwrap();
/// finder.scan(&[PathBuf::from("/photos")]).unwrap();
///
/// let (groups, summary) = finder.find_duplicates_with_summary().unwrap();
/// println!("Found {} groups, {} reclaimable", groups.len(), summary.reclaimable_display());
/// ```
pub struct DuplicateFinder {
    options: ScanOptions,
    threshold: u8,
    walker_config: WalkerConfig,
    video_config: VideoConfig,
    frame_source: Arc<dyn FrameSource>,
    stop: StopSignal,
    progress: Option<Arc<dyn ProgressCallback>>,
    files: Vec<MediaFile>,
    seen: HashSet<PathBuf>,
    walker_errors: usize,
}

impl std::fmt::Debug for DuplicateFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateFinder")
            .field("options", &self.options)
            .field("walker_config", &self.walker_config)
            .field("video_config", &self.video_config)
            .field("stop", &self.stop)
            .field("files", &self.files.len())
            .finish_non_exhaustive()
    }
}

impl DuplicateFinder {
    /// Create a finder with validated options.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Config`] for an out-of-range threshold or a
    /// zero thread count.
    pub fn new(options: ScanOptions) -> Result<Self, FinderError> {
        options.validate()?;
        let threshold = options.threshold()?;

        Ok(Self {
            options,
            threshold,
            walker_config: WalkerConfig::default(),
            video_config: VideoConfig::default(),
            frame_source: Arc::new(FfmpegFrameSource::default()),
            stop: StopSignal::new(),
            progress: None,
            files: Vec::new(),
            seen: HashSet::new(),
            walker_errors: 0,
        })
    }

    /// Set the directory walking options.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the video analysis tunables.
    #[must_use]
    pub fn with_video_config(mut self, config: VideoConfig) -> Self {
        self.video_config = config;
        self
    }

    /// Replace the decoder used by the video pass.
    #[must_use]
    pub fn with_frame_source(mut self, source: Arc<dyn FrameSource>) -> Self {
        self.frame_source = source;
        self
    }

    /// Share an existing stop signal, e.g. one hooked to Ctrl+C.
    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Replace the progress sink.
    pub fn set_progress_callback<C>(&mut self, callback: C)
    where
        C: ProgressCallback + 'static,
    {
        self.progress = Some(Arc::new(callback));
    }

    /// The active options.
    #[must_use]
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Files discovered so far, in discovery order.
    #[must_use]
    pub fn files(&self) -> &[MediaFile] {
        &self.files
    }

    /// A handle on the stop signal that other threads can trigger.
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Ask the running scan to stop. Idempotent and callable from any thread.
    pub fn request_stop(&self) {
        log::debug!("Stop requested");
        self.stop.request_stop();
    }

    /// Discover media under `directories`, appending to the file list.
    ///
    /// Every root is validated before any walking starts. Paths already
    /// discovered (by an earlier call or an overlapping root) are skipped.
    /// A stop request ends discovery early without error.
    ///
    /// Returns the number of newly discovered files.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::PathNotFound`] or [`FinderError::NotADirectory`]
    /// for an invalid root.
    pub fn scan<P: AsRef<Path>>(&mut self, directories: &[P]) -> Result<usize, FinderError> {
        let walkers: Vec<Walker> = directories
            .iter()
            .map(|dir| {
                Walker::new(dir.as_ref(), self.walker_config.clone())
                    .with_stop_signal(self.stop.clone())
            })
            .collect();
        for walker in &walkers {
            walker.validate_root()?;
        }

        if let Some(ref callback) = self.progress {
            callback.on_stage_start(Stage::Discovery, 0);
        }

        let before = self.files.len();
        for (walker, dir) in walkers.iter().zip(directories) {
            if self.stop.is_stop_requested() {
                break;
            }
            log::info!("Discovering media in {}", dir.as_ref().display());

            for entry in walker.walk() {
                match entry {
                    Ok(file) => {
                        let key =
                            std::fs::canonicalize(&file.path).unwrap_or_else(|_| file.path.clone());
                        if !self.seen.insert(key) {
                            log::trace!("Already discovered: {}", file.path.display());
                            continue;
                        }
                        if let Some(ref callback) = self.progress {
                            callback.on_discovered(self.files.len() + 1, &file.path);
                        }
                        self.files.push(file);
                    }
                    Err(e) => {
                        log::debug!("Discovery error: {}", e);
                        self.walker_errors += 1;
                    }
                }
            }
        }

        if let Some(ref callback) = self.progress {
            callback.on_stage_end(Stage::Discovery);
        }

        let added = self.files.len() - before;
        log::info!(
            "Discovery complete: {} new media files ({} total)",
            added,
            self.files.len()
        );
        Ok(added)
    }

    /// Run the enabled passes and return the merged groups.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::ThreadPool`] if a worker pool cannot be built.
    /// Cancellation is not an error.
    pub fn find_duplicates(&self) -> Result<Vec<DuplicateGroup>, FinderError> {
        self.find_duplicates_with_summary().map(|(groups, _)| groups)
    }

    /// Run the enabled passes, returning the merged groups and statistics.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::ThreadPool`] if a worker pool cannot be built.
    pub fn find_duplicates_with_summary(
        &self,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let mut summary = ScanSummary {
            total_files: self.files.len(),
            total_size: self.files.iter().map(|f| f.size).sum(),
            walker_errors: self.walker_errors,
            ..Default::default()
        };

        if !self.options.any_pass_enabled() {
            log::warn!("No passes enabled; nothing to compare");
        }

        let mut bands = Vec::new();
        if self.options.exact_match {
            bands.push(Stage::Exact);
        }
        if self.options.similar_images {
            bands.push(Stage::Image);
        }
        if self.options.similar_videos {
            bands.push(Stage::Video);
        }

        let mut exact_groups = Vec::new();
        let mut image_groups = Vec::new();
        let mut video_groups = Vec::new();
        let mut image_outcomes = Outcomes::new();
        let mut video_outcomes = Outcomes::new();

        for (band, &stage) in bands.iter().enumerate() {
            let position = (band, bands.len());
            match stage {
                Stage::Exact => {
                    let files: Vec<&MediaFile> = self.files.iter().collect();
                    let hasher = ExactHasher::new();
                    let (outcomes, mut stats) = self.run_stage(stage, position, &files, |file| {
                        match hasher.hash_file(&file.path) {
                            Ok(digest) => AnalysisOutcome::Exact(digest),
                            Err(e) => {
                                log::debug!("Cannot hash {}: {}", file.path.display(), e);
                                AnalysisOutcome::Excluded(e.into())
                            }
                        }
                    })?;

                    let entries = files.iter().filter_map(|file| match outcomes.get(&file.path) {
                        Some(AnalysisOutcome::Exact(digest)) => Some((*file, digest.as_str())),
                        _ => None,
                    });
                    exact_groups = group_exact(entries);
                    stats.groups = exact_groups.len();
                    summary.stages.push(stats);
                }
                Stage::Image => {
                    let files: Vec<&MediaFile> =
                        self.files.iter().filter(|f| f.is_image()).collect();
                    let analyzer = ImageAnalyzer::new();
                    let (outcomes, mut stats) = self.run_stage(stage, position, &files, |file| {
                        match analyzer.analyze(&file.path) {
                            Ok(record) => AnalysisOutcome::Image(record),
                            Err(e) => {
                                log::debug!("{}", e);
                                AnalysisOutcome::Excluded(e.into())
                            }
                        }
                    })?;

                    let entries: Vec<(&MediaFile, &PerceptualHashRecord)> = files
                        .iter()
                        .filter_map(|file| match outcomes.get(&file.path) {
                            Some(AnalysisOutcome::Image(record)) => Some((*file, record)),
                            _ => None,
                        })
                        .collect();
                    let threshold = self.threshold;
                    image_groups = cluster_similar(
                        MatchKind::Image,
                        &entries,
                        |a, b| analyzer.compare(a, b, threshold),
                        PerceptualHashRecord::preview,
                    );
                    stats.groups = image_groups.len();
                    summary.stages.push(stats);
                    image_outcomes = outcomes;
                }
                Stage::Video => {
                    let files: Vec<&MediaFile> =
                        self.files.iter().filter(|f| f.is_video()).collect();
                    if !files.is_empty() && !self.frame_source.is_available() {
                        log::warn!(
                            "Video decoder not available; {} videos will be excluded",
                            files.len()
                        );
                    }
                    let analyzer =
                        VideoAnalyzer::new(self.video_config.clone(), self.frame_source.clone());
                    let (outcomes, mut stats) = self.run_stage(stage, position, &files, |file| {
                        match analyzer.analyze(file) {
                            Ok(signature) => AnalysisOutcome::Video(signature),
                            Err(reason) => AnalysisOutcome::Excluded(reason),
                        }
                    })?;

                    let entries: Vec<(&MediaFile, &VideoSignature)> = files
                        .iter()
                        .filter_map(|file| match outcomes.get(&file.path) {
                            Some(AnalysisOutcome::Video(signature)) => Some((*file, signature)),
                            _ => None,
                        })
                        .collect();
                    let threshold = self.threshold;
                    video_groups = cluster_similar(
                        MatchKind::Video,
                        &entries,
                        |a, b| analyzer.compare(a, b, threshold),
                        VideoSignature::preview,
                    );
                    stats.groups = video_groups.len();
                    summary.stages.push(stats);
                    video_outcomes = outcomes;
                }
                Stage::Discovery => {}
            }
        }

        let mut groups = merge_groups([exact_groups, image_groups, video_groups]);
        fill_resolutions(&mut groups, &image_outcomes, &video_outcomes);

        summary.duplicate_groups = groups.len();
        summary.duplicate_files = groups.iter().map(|g| g.len().saturating_sub(1)).sum();
        summary.reclaimable_space = groups.iter().map(DuplicateGroup::reclaimable).sum();
        summary.interrupted = self.stop.is_stop_requested();
        summary.scan_duration = start_time.elapsed();

        if summary.interrupted {
            log::info!("Scan interrupted; returning partial results");
        }
        log::info!(
            "Scan complete: {} groups, {} duplicate files, {} reclaimable",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display()
        );

        Ok((groups, summary))
    }

    /// Run `analyze` over `files` on a bounded pool.
    ///
    /// `position` is `(band, bands)` for cumulative progress.
    fn run_stage<F>(
        &self,
        stage: Stage,
        position: (usize, usize),
        files: &[&MediaFile],
        analyze: F,
    ) -> Result<(Outcomes, StageSummary), FinderError>
    where
        F: Fn(&MediaFile) -> AnalysisOutcome + Sync,
    {
        let started = Instant::now();
        let total = files.len();
        let mut stats = StageSummary::new(stage, total);

        if let Some(ref callback) = self.progress {
            callback.on_stage_start(stage, total);
        }

        let (band, bands) = position;

        if self.stop.is_stop_requested() {
            log::info!("{} pass skipped: stop requested", stage);
            stats.skipped = total;
            self.report_band_complete(stage, band, bands, 0, total);
            if let Some(ref callback) = self.progress {
                callback.on_stage_end(stage);
            }
            return Ok((Outcomes::new(), stats));
        }

        log::info!("{} pass: analyzing {} files", stage, total);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.thread_count)
            .thread_name(move |i| format!("mediadupe-{stage}-{i}"))
            .build()?;

        let results: DashMap<PathBuf, AnalysisOutcome> = DashMap::with_capacity(total);
        // Held while reporting so the sink sees counts in order
        let processed = Mutex::new(0usize);

        pool.install(|| {
            files.par_iter().for_each(|&file| {
                if self.stop.is_stop_requested() {
                    return;
                }

                log::trace!("{} pass: {}", stage, file.path.display());
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| analyze(file)))
                    .unwrap_or_else(|_| {
                        log::warn!("Analyzer panicked on {}", file.path.display());
                        AnalysisOutcome::Excluded(ExclusionReason::Panicked)
                    });
                if let Some(reason) = outcome.exclusion() {
                    log::debug!(
                        "Excluded from {} pass: {} ({})",
                        stage,
                        file.path.display(),
                        reason
                    );
                }
                results.insert(file.path.clone(), outcome);

                let Ok(mut done) = processed.lock() else {
                    return;
                };
                *done += 1;
                if let Some(ref callback) = self.progress {
                    callback.on_progress(&ProgressUpdate {
                        percent: band_percent(band, bands, *done, total),
                        current_file: file.path.display().to_string(),
                        files_processed: *done,
                        total_files: total,
                        stage,
                    });
                }
            });
        });

        let outcomes: Outcomes = results.into_iter().collect();
        for outcome in outcomes.values() {
            match outcome.exclusion() {
                Some(reason) => *stats.exclusions.entry(reason).or_insert(0) += 1,
                None => stats.analyzed += 1,
            }
        }
        stats.skipped = total - outcomes.len();
        stats.duration = started.elapsed();

        // Workers only report files they finished
        if outcomes.len() < total || total == 0 {
            self.report_band_complete(stage, band, bands, outcomes.len(), total);
        }
        if let Some(ref callback) = self.progress {
            callback.on_stage_end(stage);
        }

        log::info!(
            "{} pass complete: {} analyzed, {} excluded, {} skipped in {:.2?}",
            stage,
            stats.analyzed,
            stats.excluded(),
            stats.skipped,
            stats.duration
        );

        Ok((outcomes, stats))
    }

    /// Report the end of a pass that had no files or was cut short.
    fn report_band_complete(
        &self,
        stage: Stage,
        band: usize,
        bands: usize,
        processed: usize,
        total: usize,
    ) {
        if let Some(ref callback) = self.progress {
            callback.on_progress(&ProgressUpdate {
                percent: band_percent(band, bands, total, total),
                current_file: String::new(),
                files_processed: processed,
                total_files: total,
                stage,
            });
        }
    }
}

/// Set each member's resolution from the image or video record of the same
/// run, leaving `"Unknown"` when neither pass decoded it.
fn fill_resolutions(groups: &mut [DuplicateGroup], images: &Outcomes, videos: &Outcomes) {
    for member in groups.iter_mut().flat_map(|g| g.members.iter_mut()) {
        let resolution = match images.get(&member.file.path) {
            Some(AnalysisOutcome::Image(record)) => Some(record.resolution()),
            _ => match videos.get(&member.file.path) {
                Some(AnalysisOutcome::Video(signature)) => Some(signature.resolution()),
                _ => None,
            },
        };
        if let Some(resolution) = resolution {
            member.resolution = resolution;
        }
    }
}
