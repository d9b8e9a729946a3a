use mediadupe::config::ScanOptions;
use mediadupe::duplicates::DuplicateFinder;
use std::fs::{self, File};
use std::io::Write;
use tempfile::tempdir;

fn write(path: &std::path::Path, content: &[u8]) {
    File::create(path).unwrap().write_all(content).unwrap();
}

#[test]
fn test_duplicates_across_roots() {
    let photos = tempdir().unwrap();
    let backup = tempdir().unwrap();
    write(&photos.path().join("img.jpg"), b"holiday");
    write(&backup.path().join("img-copy.jpg"), b"holiday");

    let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();
    finder.scan(&[photos.path(), backup.path()]).unwrap();
    let groups = finder.find_duplicates().unwrap();

    assert_eq!(groups.len(), 1);
    // Earliest discovered first: roots are walked in the order given
    assert!(groups[0].members[0].path().starts_with(photos.path()));
    assert!(groups[0].members[1].path().starts_with(backup.path()));
}

#[test]
fn test_same_root_twice_is_scanned_once() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.png"), b"one");
    write(&dir.path().join("b.png"), b"two");

    let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();
    let added = finder.scan(&[dir.path(), dir.path()]).unwrap();

    assert_eq!(added, 2);
    assert!(finder.find_duplicates().unwrap().is_empty());
}

#[test]
fn test_nested_root_does_not_duplicate_files() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    write(&sub.join("a.mov"), b"clip");

    let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();
    finder.scan(&[dir.path(), sub.as_path()]).unwrap();

    assert_eq!(finder.files().len(), 1);
    assert!(finder.find_duplicates().unwrap().is_empty());
}

#[test]
fn test_scan_calls_accumulate() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    write(&first.path().join("a.bmp"), b"pixels");
    write(&second.path().join("b.bmp"), b"pixels");

    let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();
    assert_eq!(finder.scan(&[first.path()]).unwrap(), 1);
    assert_eq!(finder.scan(&[second.path()]).unwrap(), 1);
    assert_eq!(finder.scan(&[first.path()]).unwrap(), 0);

    let (groups, summary) = finder.find_duplicates_with_summary().unwrap();
    assert_eq!(summary.total_files, 2);
    assert_eq!(groups.len(), 1);
}
