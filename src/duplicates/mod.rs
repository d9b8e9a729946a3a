//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Running the exact, image and video passes over discovered media
//! - Grouping pass results (digest equality, greedy similarity clustering)
//! - Merging the passes into one non-overlapping group list

pub mod finder;
pub mod groups;

pub use finder::{AnalysisOutcome, DuplicateFinder, FinderError, ScanSummary, StageSummary};
pub use groups::{
    cluster_similar, group_exact, merge_groups, DuplicateGroup, GroupMember, MatchKind,
    UNKNOWN_RESOLUTION,
};
