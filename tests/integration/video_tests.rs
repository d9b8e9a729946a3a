use image::{DynamicImage, GrayImage, Luma};
use mediadupe::config::ScanOptions;
use mediadupe::duplicates::{DuplicateFinder, MatchKind};
use mediadupe::scanner::{
    ExclusionReason, FrameError, FrameSource, VideoConfig, VideoMetadata,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;

/// Synthetic decoder keyed on the file stem.
///
/// - `long*` clips last 40s instead of 30s
/// - `alt*` clips have different picture content
/// - `slow*` clips take 40ms per frame
/// - `broken*` clips fail to probe
struct SyntheticSource;

impl FrameSource for SyntheticSource {
    fn probe(&self, path: &Path, _deadline: Instant) -> Result<VideoMetadata, FrameError> {
        let stem = stem(path);
        if stem.starts_with("broken") {
            return Err(FrameError::Probe {
                path: path.display().to_string(),
                message: "moov atom not found".to_string(),
            });
        }
        let duration = if stem.starts_with("long") { 40.0 } else { 30.0 };
        Ok(VideoMetadata {
            fps: 25.0,
            frame_count: (duration * 25.0) as u64,
            width: 1280,
            height: 720,
            duration,
        })
    }

    fn read_frame(
        &self,
        path: &Path,
        metadata: &VideoMetadata,
        index: u64,
        _deadline: Instant,
    ) -> Result<DynamicImage, FrameError> {
        let stem = stem(path);
        if stem.starts_with("slow") {
            std::thread::sleep(Duration::from_millis(40));
        }
        // Content depends on relative position, so clips of any length match
        let slot = index * 10 / metadata.frame_count.max(1);
        let level = (slot as u8) * 23 + if stem.starts_with("alt") { 7 } else { 0 };
        Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            32,
            32,
            Luma([level]),
        )))
    }
}

fn stem(path: &Path) -> String {
    path.file_stem().unwrap().to_string_lossy().to_string()
}

/// Write a video-sized file with unique bytes.
fn write_clip(dir: &Path, name: &str, fill: u8) {
    std::fs::write(dir.join(name), vec![fill; 2048]).unwrap();
}

fn video_finder(threshold: i64) -> DuplicateFinder {
    DuplicateFinder::new(ScanOptions {
        exact_match: false,
        similar_videos: true,
        similarity_threshold: threshold,
        ..Default::default()
    })
    .unwrap()
    .with_frame_source(Arc::new(SyntheticSource))
}

#[test]
fn test_reencoded_clips_group_together() {
    let dir = tempdir().unwrap();
    write_clip(dir.path(), "clip.mp4", 1);
    write_clip(dir.path(), "clip-reencode.mkv", 2);
    write_clip(dir.path(), "alt.mp4", 3);

    let mut finder = video_finder(90);
    finder.scan(&[dir.path()]).unwrap();
    let (groups, summary) = finder.find_duplicates_with_summary().unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, MatchKind::Video);
    let names: Vec<_> = groups[0]
        .paths()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, ["clip-reencode.mkv", "clip.mp4"]);
    assert_eq!(groups[0].members[0].resolution, "1280x720");
    assert_eq!(groups[0].hash.len(), 16);
    assert_eq!(summary.stages[0].analyzed, 3);
}

#[test]
fn test_duration_mismatch_lowers_similarity() {
    let dir = tempdir().unwrap();
    write_clip(dir.path(), "a.mp4", 1);
    write_clip(dir.path(), "long.mp4", 2);

    let mut strict = video_finder(90);
    strict.scan(&[dir.path()]).unwrap();
    assert!(strict.find_duplicates().unwrap().is_empty());

    // Same frames, 33% longer: 100% positional match penalised to 80%
    let mut lenient = video_finder(80);
    lenient.scan(&[dir.path()]).unwrap();
    assert_eq!(lenient.find_duplicates().unwrap().len(), 1);
}

#[test]
fn test_slow_and_broken_clips_are_excluded() {
    let dir = tempdir().unwrap();
    write_clip(dir.path(), "broken.mp4", 1);
    write_clip(dir.path(), "slow.mp4", 2);
    std::fs::write(dir.path().join("tiny.mp4"), b"too small").unwrap();
    write_clip(dir.path(), "x.mp4", 4);
    write_clip(dir.path(), "y.mp4", 5);

    let mut finder = video_finder(90).with_video_config(VideoConfig {
        time_budget: Duration::from_millis(100),
        ..VideoConfig::default()
    });
    finder.scan(&[dir.path()]).unwrap();
    let (groups, summary) = finder.find_duplicates_with_summary().unwrap();

    let stage = &summary.stages[0];
    assert_eq!(stage.dispatched, 5);
    assert_eq!(stage.analyzed, 2);
    assert_eq!(
        stage.exclusions.get(&ExclusionReason::DecodeFailed),
        Some(&1)
    );
    assert_eq!(stage.exclusions.get(&ExclusionReason::TimedOut), Some(&1));
    assert_eq!(
        stage.exclusions.get(&ExclusionReason::BelowSizeFloor),
        Some(&1)
    );
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_exact_copies_win_over_video_similarity() {
    let dir = tempdir().unwrap();
    write_clip(dir.path(), "a.mp4", 9);
    write_clip(dir.path(), "b.mp4", 9);
    write_clip(dir.path(), "c.mp4", 8);

    let mut finder = DuplicateFinder::new(ScanOptions {
        exact_match: true,
        similar_videos: true,
        ..Default::default()
    })
    .unwrap()
    .with_frame_source(Arc::new(SyntheticSource));
    finder.scan(&[dir.path()]).unwrap();
    let groups = finder.find_duplicates().unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, MatchKind::Exact);
    assert_eq!(groups[0].len(), 2);
    // Resolution comes from the video record even though that group was dropped
    assert_eq!(groups[0].members[0].resolution, "1280x720");
}
