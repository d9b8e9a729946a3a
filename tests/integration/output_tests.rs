use clap::Parser;
use mediadupe::cli::Cli;
use mediadupe::config::ScanOptions;
use mediadupe::duplicates::DuplicateFinder;
use mediadupe::error::ExitCode;
use mediadupe::output::{CsvOutput, JsonOutput, TextOutput};
use std::fs;
use tempfile::tempdir;

fn scanned_dir() -> (tempfile::TempDir, DuplicateFinder) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.jpg"), b"same jpeg bytes").unwrap();
    fs::write(dir.path().join("b.jpg"), b"same jpeg bytes").unwrap();
    fs::write(dir.path().join("c.jpg"), b"other").unwrap();

    let mut finder = DuplicateFinder::new(ScanOptions::default()).unwrap();
    finder.scan(&[dir.path()]).unwrap();
    (dir, finder)
}

#[test]
fn test_json_export_round_trips_through_serde_json() {
    let (_dir, finder) = scanned_dir();
    let (groups, summary) = finder.find_duplicates_with_summary().unwrap();

    let output = JsonOutput::new(&groups, &summary, ExitCode::Success);
    let value: serde_json::Value = serde_json::from_str(&output.to_json().unwrap()).unwrap();

    let group = &value["duplicates"][0];
    assert_eq!(group["kind"], "exact");
    assert_eq!(group["members"].as_array().unwrap().len(), 2);
    assert_eq!(group["members"][0]["resolution"], "Unknown");
    assert_eq!(value["summary"]["total_files"], 3);
    assert_eq!(value["summary"]["stages"][0]["stage"], "exact");
    assert_eq!(value["summary"]["stages"][0]["analyzed"], 3);
}

#[test]
fn test_csv_export_one_row_per_member() {
    let (_dir, finder) = scanned_dir();
    let groups = finder.find_duplicates().unwrap();

    let csv = CsvOutput::new(&groups).to_string().unwrap();
    let rows: Vec<&str> = csv.lines().skip(1).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.starts_with("1,exact,")));
    assert!(rows[0].contains("a.jpg"));
    assert!(rows[1].contains("b.jpg"));
}

#[test]
fn test_text_report_mentions_reclaimable_space() {
    let (_dir, finder) = scanned_dir();
    let (groups, summary) = finder.find_duplicates_with_summary().unwrap();

    let mut buffer = Vec::new();
    TextOutput::new(&groups, &summary)
        .write_to(&mut buffer)
        .unwrap();
    let text = String::from_utf8(buffer).unwrap();

    assert!(text.contains("Group 1 [exact]"));
    assert!(text.contains("1 groups, 1 duplicate files"));
}

#[test]
fn test_run_app_exit_codes() {
    let (dir, _finder) = scanned_dir();
    let path = dir.path().to_str().unwrap();

    let found = Cli::try_parse_from(["mediadupe", "-q", "scan", path, "--output", "csv"]).unwrap();
    assert_eq!(mediadupe::run_app(found).unwrap(), ExitCode::Success);

    let empty = tempdir().unwrap();
    let none = Cli::try_parse_from([
        "mediadupe",
        "-q",
        "scan",
        empty.path().to_str().unwrap(),
        "--output",
        "json",
    ])
    .unwrap();
    assert_eq!(mediadupe::run_app(none).unwrap(), ExitCode::NoDuplicates);
}

#[test]
fn test_run_app_rejects_bad_threshold_and_missing_root() {
    let dir = tempdir().unwrap();
    let path = dir.path().to_str().unwrap();

    let bad = Cli::try_parse_from(["mediadupe", "-q", "scan", path, "--threshold", "20"]).unwrap();
    let err = mediadupe::run_app(bad).unwrap_err();
    assert!(format!("{err:#}").contains("between 50 and 100"));

    let missing = dir.path().join("gone");
    let cli = Cli::try_parse_from(["mediadupe", "-q", "scan", missing.to_str().unwrap()]).unwrap();
    let err = mediadupe::run_app(cli).unwrap_err();
    assert!(format!("{err:#}").contains("Path not found"));
}
