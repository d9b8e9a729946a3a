//! Human-readable report of scan results.
//!
//! ```text
//! Group 1 [exact] 9f86d081884c7d65... (2 files, 1.0 KiB reclaimable)
//!   /photos/a.jpg  1.0 KiB  640x480  9f86d081884c7d65
//!   /photos/b.jpg  1.0 KiB  640x480  9f86d081884c7d65
//!
//! Scanned 120 files (48.2 MiB) in 1.20s
//! 1 groups, 1 duplicate files, 1.0 KiB reclaimable
//! Excluded: 2 timed out, 1 decode failed
//! ```

use std::io::Write;

use bytesize::ByteSize;

use crate::duplicates::{DuplicateGroup, ScanSummary};

/// Characters of the group hash shown in headers.
const HASH_HEADER_LEN: usize = 16;

/// Formatter for the plain-text report.
pub struct TextOutput<'a> {
    groups: &'a [DuplicateGroup],
    summary: &'a ScanSummary,
}

impl<'a> TextOutput<'a> {
    /// Create a new text formatter.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup], summary: &'a ScanSummary) -> Self {
        Self { groups, summary }
    }

    /// Write groups followed by the summary block.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (idx, group) in self.groups.iter().enumerate() {
            self.write_group(writer, idx + 1, group)?;
        }
        self.write_summary(writer)
    }

    fn write_group<W: Write>(
        &self,
        writer: &mut W,
        number: usize,
        group: &DuplicateGroup,
    ) -> std::io::Result<()> {
        let short: String = group.hash.chars().take(HASH_HEADER_LEN).collect();
        let ellipsis = if group.hash.chars().count() > HASH_HEADER_LEN {
            "..."
        } else {
            ""
        };
        writeln!(
            writer,
            "Group {number} [{}] {short}{ellipsis} ({} files, {} reclaimable)",
            group.kind,
            group.len(),
            ByteSize::b(group.reclaimable())
        )?;
        for member in &group.members {
            writeln!(
                writer,
                "  {}  {}  {}  {}",
                member.path().display(),
                ByteSize::b(member.file.size),
                member.resolution,
                member.hash_preview
            )?;
        }
        writeln!(writer)
    }

    fn write_summary<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let s = self.summary;
        writeln!(
            writer,
            "Scanned {} files ({}) in {:.2}s",
            s.total_files,
            s.total_size_display(),
            s.scan_duration.as_secs_f64()
        )?;
        writeln!(
            writer,
            "{} groups, {} duplicate files, {} reclaimable",
            s.duplicate_groups,
            s.duplicate_files,
            s.reclaimable_display()
        )?;

        let exclusions = s.exclusions();
        if !exclusions.is_empty() {
            let parts: Vec<String> = exclusions
                .iter()
                .map(|(reason, count)| format!("{count} {reason}"))
                .collect();
            writeln!(writer, "Excluded: {}", parts.join(", "))?;
        }
        if s.walker_errors > 0 {
            writeln!(writer, "Unreadable entries skipped: {}", s.walker_errors)?;
        }
        if s.interrupted {
            writeln!(writer, "Scan interrupted: results are partial")?;
        }
        Ok(())
    }
}
