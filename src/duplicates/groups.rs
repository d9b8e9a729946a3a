//! Duplicate groups: building them per pass and merging the passes.
//!
//! # Overview
//!
//! - [`group_exact`] buckets files by identical SHA-256 digest.
//! - [`cluster_similar`] runs greedy pairwise clustering for the image and
//!   video passes. Each unclaimed file in discovery order seeds a group and
//!   pulls in every later unclaimed file that matches the seed. This is
//!   quadratic per pass and order-dependent; both properties are part of the
//!   observable behaviour and must not change.
//! - [`merge_groups`] reconciles the passes in priority order (exact, image,
//!   video). A group is accepted only when none of its paths was claimed by an
//!   earlier accepted group; otherwise the whole group is dropped.
//!
//! Within every group the first member is the earliest discovered file.
//!
//! # Example
//!
//! ```
//! use mediadupe::duplicates::{group_exact, merge_groups};
//! use mediadupe::scanner::MediaFile;
//! use std::path::PathBuf;
//!
//! let a = MediaFile::new(PathBuf::from("/p/a.jpg"), 10).unwrap();
//! let b = MediaFile::new(PathBuf::from("/p/b.jpg"), 10).unwrap();
//! let c = MediaFile::new(PathBuf::from("/p/c.jpg"), 12).unwrap();
//!
//! let exact = group_exact(vec![(&a, "aa"), (&b, "aa"), (&c, "cc")]);
//! assert_eq!(exact.len(), 1);
//! assert_eq!(exact[0].len(), 2);
//!
//! let merged = merge_groups(vec![exact]);
//! assert_eq!(merged[0].members[0].file.path, PathBuf::from("/p/a.jpg"));
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::scanner::MediaFile;

/// Resolution shown when no image or video record knows the dimensions.
pub const UNKNOWN_RESOLUTION: &str = "Unknown";

/// Length of the per-member digest preview for exact groups.
const DIGEST_PREVIEW_LEN: usize = 16;

/// Which pass produced a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Byte-identical content
    Exact,
    /// Perceptually similar images
    Image,
    /// Videos with matching frame signatures
    Video,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::Image => "image",
            Self::Video => "video",
        })
    }
}

/// One file inside a [`DuplicateGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupMember {
    /// The discovered file
    #[serde(flatten)]
    pub file: MediaFile,
    /// `"WxH"`, or `"Unknown"` when no pass decoded the file
    pub resolution: String,
    /// Short hash string identifying this member's fingerprint
    pub hash_preview: String,
}

impl GroupMember {
    /// Member with an unknown resolution.
    #[must_use]
    pub fn new(file: MediaFile, hash_preview: String) -> Self {
        Self {
            file,
            resolution: UNKNOWN_RESOLUTION.to_string(),
            hash_preview,
        }
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file.path
    }
}

/// Two or more files considered duplicates of each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Pass that produced the group
    pub kind: MatchKind,
    /// Representative hash: SHA-256 hex, pHash hex or first frame hash hex
    pub hash: String,
    /// Members in discovery order; the first is the representative
    pub members: Vec<GroupMember>,
}

impl DuplicateGroup {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.members.iter().map(GroupMember::path)
    }

    /// Sum of member sizes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.members.iter().map(|m| m.file.size).sum()
    }

    /// Bytes freed by keeping only the first member.
    #[must_use]
    pub fn reclaimable(&self) -> u64 {
        self.members.iter().skip(1).map(|m| m.file.size).sum()
    }
}

/// Group files whose digests are identical.
///
/// `entries` must be in discovery order; groups come out ordered by their
/// first member and singletons are dropped.
#[must_use]
pub fn group_exact<'a, I>(entries: I) -> Vec<DuplicateGroup>
where
    I: IntoIterator<Item = (&'a MediaFile, &'a str)>,
{
    let mut order: Vec<(&str, Vec<&MediaFile>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for (file, digest) in entries {
        match index.get(digest) {
            Some(&i) => order[i].1.push(file),
            None => {
                index.insert(digest, order.len());
                order.push((digest, vec![file]));
            }
        }
    }

    order
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(digest, files)| {
            let preview: String = digest.chars().take(DIGEST_PREVIEW_LEN).collect();
            log::debug!("Exact group {}: {} files", preview, files.len());
            DuplicateGroup {
                kind: MatchKind::Exact,
                hash: digest.to_string(),
                members: files
                    .into_iter()
                    .map(|f| GroupMember::new(f.clone(), preview.clone()))
                    .collect(),
            }
        })
        .collect()
}

/// Greedy pairwise clustering.
///
/// For each unclaimed entry in order, a new group is seeded with it and every
/// later unclaimed entry for which `matches(seed, candidate)` holds joins the
/// group and becomes claimed. Groups of one are dropped. `preview` renders a
/// fingerprint as the member's hash preview; the seed's preview becomes the
/// group hash.
#[must_use]
pub fn cluster_similar<T, M, P>(
    kind: MatchKind,
    entries: &[(&MediaFile, &T)],
    matches: M,
    preview: P,
) -> Vec<DuplicateGroup>
where
    M: Fn(&T, &T) -> bool,
    P: Fn(&T) -> String,
{
    let mut claimed = vec![false; entries.len()];
    let mut groups = Vec::new();

    for seed in 0..entries.len() {
        if claimed[seed] {
            continue;
        }
        claimed[seed] = true;
        let (seed_file, seed_print) = entries[seed];
        let mut members = vec![seed];

        for candidate in seed + 1..entries.len() {
            if !claimed[candidate] && matches(seed_print, entries[candidate].1) {
                claimed[candidate] = true;
                members.push(candidate);
            }
        }

        if members.len() < 2 {
            continue;
        }

        log::debug!(
            "{} group seeded by {}: {} files",
            kind,
            seed_file.path.display(),
            members.len()
        );
        groups.push(DuplicateGroup {
            kind,
            hash: preview(seed_print),
            members: members
                .into_iter()
                .map(|i| GroupMember::new(entries[i].0.clone(), preview(entries[i].1)))
                .collect(),
        });
    }

    groups
}

/// Merge pass results into one non-overlapping list.
///
/// `passes` must be given in priority order. Each group is accepted only if
/// it has at least two distinct members and none of its paths appears in an
/// already accepted group; rejected groups are dropped whole, never trimmed.
#[must_use]
pub fn merge_groups<I>(passes: I) -> Vec<DuplicateGroup>
where
    I: IntoIterator<Item = Vec<DuplicateGroup>>,
{
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    let mut merged = Vec::new();

    for group in passes.into_iter().flatten() {
        let distinct = {
            let mut own: HashSet<&Path> = HashSet::with_capacity(group.len());
            group.paths().all(|p| own.insert(p))
        };
        if !distinct || group.len() < 2 {
            log::debug!("Dropping malformed {} group {}", group.kind, group.hash);
            continue;
        }

        if group.paths().any(|p| claimed.contains(p)) {
            log::debug!(
                "Dropping {} group {}: a member is already grouped",
                group.kind,
                group.hash
            );
            continue;
        }

        claimed.extend(group.paths().map(Path::to_path_buf));
        merged.push(group);
    }

    merged
}
