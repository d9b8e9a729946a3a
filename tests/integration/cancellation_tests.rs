use mediadupe::config::ScanOptions;
use mediadupe::duplicates::DuplicateFinder;
use mediadupe::progress::{ProgressCallback, ProgressUpdate, Stage};
use mediadupe::signal::StopSignal;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn populate(dir: &std::path::Path, count: usize) {
    for i in 0..count {
        File::create(dir.join(format!("{i:03}.png")))
            .unwrap()
            .write_all(b"identical payload")
            .unwrap();
    }
}

#[test]
fn test_stop_before_scan_discovers_nothing() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 10);

    let stop = StopSignal::new();
    stop.request_stop();
    let mut finder = DuplicateFinder::new(ScanOptions::default())
        .unwrap()
        .with_stop_signal(stop);

    assert_eq!(finder.scan(&[dir.path()]).unwrap(), 0);
    let (groups, summary) = finder.find_duplicates_with_summary().unwrap();
    assert!(groups.is_empty());
    assert!(summary.interrupted);
}

/// Requests a stop once discovery has found `limit` files.
struct StopAfterDiscovering {
    stop: StopSignal,
    limit: usize,
}

impl ProgressCallback for StopAfterDiscovering {
    fn on_progress(&self, _update: &ProgressUpdate) {}

    fn on_discovered(&self, found: usize, _path: &Path) {
        if found == self.limit {
            self.stop.request_stop();
        }
    }
}

#[test]
fn test_stop_during_discovery_keeps_files_found_so_far() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 6);
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).unwrap();
    populate(&nested, 4);

    let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();
    let stop = finder.stop_signal();
    finder.set_progress_callback(StopAfterDiscovering { stop, limit: 3 });

    assert_eq!(finder.scan(&[dir.path()]).unwrap(), 3);
    assert_eq!(finder.files().len(), 3);

    let (groups, summary) = finder.find_duplicates_with_summary().unwrap();
    assert!(groups.is_empty());
    assert!(summary.interrupted);
    assert_eq!(summary.total_files, 3);
}

#[test]
fn test_stop_between_scan_and_find_skips_every_file() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 10);

    let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();
    finder.scan(&[dir.path()]).unwrap();
    finder.request_stop();

    let (groups, summary) = finder.find_duplicates_with_summary().unwrap();
    assert!(groups.is_empty());
    assert!(summary.interrupted);
    assert_eq!(summary.stages[0].analyzed, 0);
    assert_eq!(summary.stages[0].skipped, 10);
}

#[test]
fn test_stop_is_idempotent_and_partial_results_are_kept() {
    let dir = tempdir().unwrap();
    populate(dir.path(), 12);

    let mut finder = DuplicateFinder::new(ScanOptions {
        thread_count: 1,
        ..Default::default()
    })
    .unwrap();
    finder.scan(&[dir.path()]).unwrap();

    let stop = finder.stop_signal();
    finder.set_progress_callback(move |update: &ProgressUpdate| {
        assert_eq!(update.stage, Stage::Exact);
        if update.files_processed >= 4 {
            stop.request_stop();
            stop.request_stop();
        }
    });

    let (groups, summary) = finder.find_duplicates_with_summary().unwrap();
    let stage = &summary.stages[0];
    assert!(summary.interrupted);
    assert_eq!(stage.analyzed, 4);
    assert_eq!(stage.analyzed + stage.skipped + stage.excluded(), 12);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 4);
    assert_eq!(
        groups[0].members[0].path().file_name().unwrap(),
        "000.png"
    );
}
