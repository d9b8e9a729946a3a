//! CSV output formatter for scan results.
//!
//! One row is generated for each group member.
//!
//! # Columns
//!
//! - `group_id`: 1-based group number, in output order
//! - `kind`: `exact`, `image` or `video`
//! - `group_hash`: representative hash of the group
//! - `path`: path as discovered
//! - `size`: file size in bytes
//! - `resolution`: `WxH` or `Unknown`
//! - `hash_preview`: short per-member hash

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::{DuplicateGroup, MatchKind};

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    kind: MatchKind,
    group_hash: &'a str,
    path: String,
    size: u64,
    resolution: &'a str,
    hash_preview: &'a str,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    groups: &'a [DuplicateGroup],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self { groups }
    }

    /// Write the CSV output, header included.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, group) in self.groups.iter().enumerate() {
            for member in &group.members {
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    kind: group.kind,
                    group_hash: &group.hash,
                    path: member.path().to_string_lossy().into_owned(),
                    size: member.file.size,
                    resolution: &member.resolution,
                    hash_preview: &member.hash_preview,
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Render the CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
