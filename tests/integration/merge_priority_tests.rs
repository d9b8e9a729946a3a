use image::{GrayImage, Luma};
use mediadupe::config::ScanOptions;
use mediadupe::duplicates::{DuplicateFinder, DuplicateGroup, MatchKind};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Block pattern; `tweak` repaints one corner pixel so the file differs
/// byte-wise while staying perceptually identical.
fn save_blocks(path: &Path, tweak: Option<u8>) {
    let mut img = GrayImage::from_fn(64, 64, |x, y| {
        Luma([if (x / 8 + y / 8) % 3 == 0 { 210 } else { 30 }])
    });
    if let Some(value) = tweak {
        img.put_pixel(0, 0, Luma([value]));
    }
    img.save(path).unwrap();
}

/// Horizontal gradient, unrelated to the block pattern.
fn save_gradient(path: &Path, invert: bool) {
    let img = GrayImage::from_fn(64, 64, |x, _| {
        let v = (x * 4) as u8;
        Luma([if invert { 255 - v } else { v }])
    });
    img.save(path).unwrap();
}

fn names(group: &DuplicateGroup) -> Vec<String> {
    group
        .paths()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

fn exact_and_images() -> ScanOptions {
    ScanOptions {
        exact_match: true,
        similar_images: true,
        ..Default::default()
    }
}

#[test]
fn test_overlapping_image_group_is_dropped_not_trimmed() {
    let dir = tempdir().unwrap();
    save_blocks(&dir.path().join("a.png"), None);
    fs::copy(dir.path().join("a.png"), dir.path().join("b.png")).unwrap();
    save_blocks(&dir.path().join("c.png"), Some(200));

    let mut finder = DuplicateFinder::new(exact_and_images()).unwrap();
    finder.scan(&[dir.path()]).unwrap();
    let (groups, summary) = finder.find_duplicates_with_summary().unwrap();

    // The image pass found {a, b, c}; it overlaps the exact group, so c is
    // left ungrouped rather than folded into a trimmed {c}.
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, MatchKind::Exact);
    assert_eq!(names(&groups[0]), ["a.png", "b.png"]);
    assert_eq!(summary.duplicate_groups, 1);
}

#[test]
fn test_disjoint_groups_from_both_passes_survive() {
    let dir = tempdir().unwrap();
    save_blocks(&dir.path().join("a.png"), None);
    fs::copy(dir.path().join("a.png"), dir.path().join("b.png")).unwrap();
    save_gradient(&dir.path().join("x.png"), false);
    save_gradient(&dir.path().join("z.png"), false);

    let mut finder = DuplicateFinder::new(ScanOptions {
        exact_match: false,
        similar_images: true,
        ..Default::default()
    })
    .unwrap();
    finder.scan(&[dir.path()]).unwrap();
    let groups = finder.find_duplicates().unwrap();

    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.kind == MatchKind::Image));
    assert_eq!(names(&groups[0]), ["a.png", "b.png"]);
    assert!(names(&groups[1]).contains(&"x.png".to_string()));
    assert!(names(&groups[1]).contains(&"z.png".to_string()));
}

#[test]
fn test_dissimilar_images_stay_apart() {
    let dir = tempdir().unwrap();
    save_gradient(&dir.path().join("left.png"), false);
    save_gradient(&dir.path().join("right.png"), true);

    let mut finder = DuplicateFinder::new(ScanOptions {
        exact_match: false,
        similar_images: true,
        similarity_threshold: 50,
        ..Default::default()
    })
    .unwrap();
    finder.scan(&[dir.path()]).unwrap();

    assert!(finder.find_duplicates().unwrap().is_empty());
}

#[test]
fn test_no_file_appears_twice() {
    let dir = tempdir().unwrap();
    for (i, tweak) in [None, Some(200), Some(190), Some(180)].iter().enumerate() {
        save_blocks(&dir.path().join(format!("{i}.png")), *tweak);
    }
    fs::copy(dir.path().join("0.png"), dir.path().join("5.png")).unwrap();

    let mut finder = DuplicateFinder::new(exact_and_images()).unwrap();
    finder.scan(&[dir.path()]).unwrap();
    let groups = finder.find_duplicates().unwrap();

    let mut seen = std::collections::HashSet::new();
    for group in &groups {
        assert!(group.len() >= 2);
        for path in group.paths() {
            assert!(seen.insert(path.to_path_buf()), "{} repeated", path.display());
        }
    }
}
