//! JSON output formatter for scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "kind": "exact",
//!       "hash": "9f86d08...",
//!       "members": [
//!         {
//!           "path": "/photos/a.jpg",
//!           "size": 1024,
//!           "extension": "jpg",
//!           "media_kind": "image",
//!           "resolution": "640x480",
//!           "hash_preview": "9f86d081884c7d65"
//!         }
//!       ]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 100,
//!     "duplicate_groups": 5,
//!     "stages": [{ "stage": "exact", "analyzed": 98, "exclusions": { "unreadable": 2 } }],
//!     "interrupted": false,
//!     "exit_code": 0
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, MatchKind, ScanSummary, StageSummary};
use crate::error::ExitCode;
use crate::progress::Stage;
use crate::scanner::{ExclusionReason, MediaKind};

/// One group member in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonMember {
    /// Absolute path where it can be resolved
    pub path: String,
    /// File size in bytes
    pub size: u64,
    /// Lowercase extension
    pub extension: String,
    /// Image or video
    pub media_kind: MediaKind,
    /// `"WxH"` or `"Unknown"`
    pub resolution: String,
    /// Short hash for display
    pub hash_preview: String,
}

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Pass that produced the group
    pub kind: MatchKind,
    /// Representative hash of the group
    pub hash: String,
    /// Members, earliest discovered first
    pub members: Vec<JsonMember>,
}

impl JsonDuplicateGroup {
    /// Convert a [`DuplicateGroup`], normalizing paths where possible.
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            kind: group.kind,
            hash: group.hash.clone(),
            members: group
                .members
                .iter()
                .map(|m| JsonMember {
                    path: normalize_path(m.path()),
                    size: m.file.size,
                    extension: m.file.extension.clone(),
                    media_kind: m.file.kind,
                    resolution: m.resolution.clone(),
                    hash_preview: m.hash_preview.clone(),
                })
                .collect(),
        }
    }
}

/// Per-pass counters in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonStage {
    /// Pass name
    pub stage: Stage,
    /// Files eligible for the pass
    pub dispatched: usize,
    /// Files that produced a result
    pub analyzed: usize,
    /// Files never started because of a stop request
    pub skipped: usize,
    /// Groups before merging
    pub groups: usize,
    /// Exclusions by reason
    pub exclusions: BTreeMap<ExclusionReason, usize>,
    /// Pass duration in milliseconds
    pub duration_ms: u64,
}

impl From<&StageSummary> for JsonStage {
    fn from(stage: &StageSummary) -> Self {
        Self {
            stage: stage.stage,
            dispatched: stage.dispatched,
            analyzed: stage.analyzed,
            skipped: stage.skipped,
            groups: stage.groups,
            exclusions: stage.exclusions.clone(),
            duration_ms: millis(stage.duration),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Media files discovered
    pub total_files: usize,
    /// Bytes discovered
    pub total_size: u64,
    /// Entries the walker could not read
    pub walker_errors: usize,
    /// Groups after merging
    pub duplicate_groups: usize,
    /// Duplicate files, excluding each group's first member
    pub duplicate_files: usize,
    /// Bytes reclaimable by keeping one file per group
    pub reclaimable_space: u64,
    /// Per-pass counters
    pub stages: Vec<JsonStage>,
    /// Duration of the run in milliseconds
    pub scan_duration_ms: u64,
    /// Whether a stop was requested
    pub interrupted: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "MD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a [`ScanSummary`] and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            walker_errors: summary.walker_errors,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            stages: summary.stages.iter().map(JsonStage::from).collect(),
            scan_duration_ms: millis(summary.scan_duration),
            interrupted: summary.interrupted,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Merged duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from groups, summary and exit code.
    ///
    /// # Example
    ///
    /// ```
    /// use mediadupe::duplicates::ScanSummary;
    /// use mediadupe::error::ExitCode;
    /// use mediadupe::output::json::JsonOutput;
    ///
    /// let output = JsonOutput::new(&[], &ScanSummary::default(), ExitCode::NoDuplicates);
    /// assert!(output.duplicates.is_empty());
    /// assert_eq!(output.summary.exit_code, 2);
    /// ```
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            duplicates: groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Canonicalize a path for output, falling back to the path as given.
fn normalize_path(path: &std::path::Path) -> String {
    match path.canonicalize() {
        Ok(canonical) => canonical.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::GroupMember;
    use crate::scanner::MediaFile;
    use std::path::PathBuf;
    use std::time::Duration;

    fn member(path: &str, size: u64, resolution: &str) -> GroupMember {
        let file = MediaFile::new(PathBuf::from(path), size).unwrap();
        let mut member = GroupMember::new(file, "00ff00ff00ff00ff".to_string());
        member.resolution = resolution.to_string();
        member
    }

    fn create_test_groups() -> Vec<DuplicateGroup> {
        vec![
            DuplicateGroup {
                kind: MatchKind::Exact,
                hash: "ab".repeat(32),
                members: vec![
                    member("/nonexistent/a.jpg", 1024, "64x64"),
                    member("/nonexistent/b.jpg", 1024, "64x64"),
                ],
            },
            DuplicateGroup {
                kind: MatchKind::Video,
                hash: "0123456789abcdef".to_string(),
                members: vec![
                    member("/nonexistent/x.mp4", 5000, "Unknown"),
                    member("/nonexistent/y.mkv", 4000, "Unknown"),
                    member("/nonexistent/z.mov", 3000, "Unknown"),
                ],
            },
        ]
    }

    fn create_test_summary() -> ScanSummary {
        let mut exclusions = BTreeMap::new();
        exclusions.insert(ExclusionReason::TimedOut, 2);
        ScanSummary {
            total_files: 10,
            total_size: 20_000,
            walker_errors: 1,
            stages: vec![StageSummary {
                stage: Stage::Video,
                dispatched: 5,
                analyzed: 3,
                exclusions,
                skipped: 0,
                groups: 1,
                duration: Duration::from_millis(250),
            }],
            duplicate_groups: 2,
            duplicate_files: 3,
            reclaimable_space: 8024,
            interrupted: false,
            scan_duration: Duration::from_millis(1234),
        }
    }

    #[test]
    fn test_json_output_with_groups() {
        let output = JsonOutput::new(
            &create_test_groups(),
            &create_test_summary(),
            ExitCode::Success,
        );

        assert_eq!(output.duplicates.len(), 2);
        assert_eq!(output.duplicates[0].members.len(), 2);
        assert_eq!(output.duplicates[1].members.len(), 3);
        assert_eq!(output.duplicates[1].kind, MatchKind::Video);
        assert_eq!(output.summary.scan_duration_ms, 1234);
        assert_eq!(output.summary.stages[0].duration_ms, 250);
    }

    #[test]
    fn test_json_is_valid() {
        let output = JsonOutput::new(
            &create_test_groups(),
            &create_test_summary(),
            ExitCode::Success,
        );
        let json = output.to_json().unwrap();
        assert!(!json.contains('\n'));

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let first = &parsed["duplicates"][0];
        assert_eq!(first["kind"], "exact");
        assert_eq!(first["members"][0]["path"], "/nonexistent/a.jpg");
        assert_eq!(first["members"][0]["media_kind"], "image");
        assert_eq!(first["members"][0]["resolution"], "64x64");

        let stage = &parsed["summary"]["stages"][0];
        assert_eq!(stage["stage"], "video");
        assert_eq!(stage["exclusions"]["timed_out"], 2);
        assert_eq!(parsed["summary"]["exit_code_name"], "MD000");
    }

    #[test]
    fn test_write_to_pretty() {
        let output = JsonOutput::new(&[], &ScanSummary::default(), ExitCode::NoDuplicates);
        let mut buffer = Vec::new();
        output.write_to(&mut buffer, true).unwrap();

        let written = String::from_utf8(buffer).unwrap();
        assert!(written.starts_with('{'));
        assert!(written.ends_with("}\n"));
        assert!(written.matches('\n').count() > 1);
    }

    #[test]
    fn test_json_summary_interrupted() {
        let summary = ScanSummary {
            interrupted: true,
            ..Default::default()
        };
        let output = JsonOutput::new(&[], &summary, ExitCode::Interrupted);
        assert!(output.summary.interrupted);
        assert_eq!(output.summary.exit_code, 130);
    }
}
