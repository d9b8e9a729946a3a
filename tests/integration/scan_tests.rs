use mediadupe::config::ScanOptions;
use mediadupe::duplicates::{DuplicateFinder, MatchKind};
use mediadupe::scanner::{MediaKind, WalkerConfig};
use std::fs::{self, File};
use std::io::Write;
use tempfile::tempdir;

fn write(path: &std::path::Path, content: &[u8]) {
    File::create(path).unwrap().write_all(content).unwrap();
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();

    assert_eq!(finder.scan(&[dir.path()]).unwrap(), 0);
    let (groups, summary) = finder.find_duplicates_with_summary().unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
    assert!(!summary.interrupted);
}

#[test]
fn test_non_media_files_are_ignored() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("notes.txt"), b"same");
    write(&dir.path().join("copy.txt"), b"same");
    write(&dir.path().join("README"), b"same");
    write(&dir.path().join("photo.JPG"), b"same");

    let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();
    finder.scan(&[dir.path()]).unwrap();

    assert_eq!(finder.files().len(), 1);
    assert_eq!(finder.files()[0].extension, "jpg");
    assert_eq!(finder.files()[0].kind, MediaKind::Image);
    assert!(finder.find_duplicates().unwrap().is_empty());
}

#[test]
fn test_exact_duplicates_across_image_and_video_extensions() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.jpg"), b"identical bytes");
    write(&dir.path().join("b.mp4"), b"identical bytes");
    write(&dir.path().join("c.png"), b"different bytes");

    let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();
    finder.scan(&[dir.path()]).unwrap();
    let (groups, summary) = finder.find_duplicates_with_summary().unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, MatchKind::Exact);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(groups[0].hash.len(), 64);
    assert_eq!(summary.duplicate_files, 1);
    assert_eq!(summary.reclaimable_space, 15);
}

#[test]
fn test_nested_directories_are_walked() {
    let dir = tempdir().unwrap();
    let deep = dir.path().join("2024").join("summer");
    fs::create_dir_all(&deep).unwrap();
    write(&dir.path().join("top.gif"), b"gif bytes");
    write(&deep.join("nested.gif"), b"gif bytes");

    let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();
    finder.scan(&[dir.path()]).unwrap();
    let groups = finder.find_duplicates().unwrap();

    assert_eq!(groups.len(), 1);
    assert!(groups[0].paths().any(|p| p.ends_with("summer/nested.gif")));
}

#[test]
fn test_empty_files_group_together() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.png"), b"");
    write(&dir.path().join("b.png"), b"");

    let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();
    finder.scan(&[dir.path()]).unwrap();
    let groups = finder.find_duplicates().unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].total_size(), 0);
}

#[test]
fn test_skip_hidden() {
    let dir = tempfile::Builder::new().prefix("scan").tempdir().unwrap();
    let hidden = dir.path().join(".thumbnails");
    fs::create_dir(&hidden).unwrap();
    write(&dir.path().join("a.webp"), b"webp");
    write(&hidden.join("a.webp"), b"webp");

    let mut visible = DuplicateFinder::new(ScanOptions::default())
        .unwrap()
        .with_walker_config(WalkerConfig {
            skip_hidden: true,
            ..Default::default()
        });
    visible.scan(&[dir.path()]).unwrap();
    assert_eq!(visible.files().len(), 1);
    assert!(visible.find_duplicates().unwrap().is_empty());

    let mut all = DuplicateFinder::new(ScanOptions::default()).unwrap();
    all.scan(&[dir.path()]).unwrap();
    assert_eq!(all.find_duplicates().unwrap().len(), 1);
}

#[test]
fn test_scan_missing_root_fails_before_walking() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.jpg"), b"x");

    let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();
    let missing = dir.path().join("missing");
    assert!(finder.scan(&[dir.path(), missing.as_path()]).is_err());
    assert!(finder.files().is_empty());
}
