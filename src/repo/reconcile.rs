//! repo::reconcile
//!
//! Merge a local tree listing with the review service's file status map.
//!
//! # Algorithm
//!
//! 1. Index the local entries of a directory by base name; every entry
//!    starts out `CURRENT`.
//! 2. Keep only diff entries whose path lies under that directory, at any
//!    depth. The root keeps every entry.
//! 3. A diff entry whose base name is already indexed overwrites the
//!    entry's status; any other diff entry is inserted under its base name
//!    as a new entry without dates.
//!
//! Codes without a mapping leave the status unset and are logged.
//!
//! # Example
//!
//! ```
//! use registry_vcs::core::types::{FileEntry, FileStatus};
//! use registry_vcs::repo::reconcile::reconcile;
//! use registry_vcs::review::FileDiffMap;
//!
//! let local = vec![
//!     FileEntry::current("a", "forms/a"),
//!     FileEntry::current("b", "forms/b"),
//! ];
//! let mut diffs = FileDiffMap::new();
//! diffs.insert("forms/b".to_string(), Some('D'));
//! diffs.insert("forms/d".to_string(), Some('A'));
//!
//! let merged = reconcile("forms", local, &diffs);
//! let statuses: Vec<_> = merged.iter().map(|e| (e.name.as_str(), e.status)).collect();
//! assert_eq!(statuses, vec![
//!     ("a", Some(FileStatus::Current)),
//!     ("b", Some(FileStatus::Deleted)),
//!     ("d", Some(FileStatus::New)),
//! ]);
//! ```

use std::collections::BTreeMap;

use tracing::warn;

use crate::core::types::{FileEntry, FileStatus};
use crate::review::FileDiffMap;

/// Reconcile `local` entries of directory `dir` with the change's `diffs`.
///
/// `dir` is a normalized repository path, empty for the root. The result is
/// ordered by file name.
pub fn reconcile(dir: &str, local: Vec<FileEntry>, diffs: &FileDiffMap) -> Vec<FileEntry> {
    let mut by_name: BTreeMap<String, FileEntry> = local
        .into_iter()
        .map(|entry| (entry.name.clone(), entry))
        .collect();

    let prefix = if dir.is_empty() {
        String::new()
    } else {
        format!("{dir}/")
    };

    for (path, code) in diffs {
        let path = path.trim_matches('/');
        if !path.starts_with(&prefix) {
            continue;
        }
        let name = path.rsplit('/').next().unwrap_or(path);
        if name.is_empty() {
            continue;
        }

        let status = FileStatus::from_diff_code(*code);
        if status.is_none() {
            warn!(path = %path, code = ?code, "unmapped review status code");
        }

        match by_name.get_mut(name) {
            Some(entry) => entry.status = status,
            None => {
                by_name.insert(
                    name.to_string(),
                    FileEntry {
                        name: name.to_string(),
                        path: path.to_string(),
                        status,
                        created: None,
                        updated: None,
                    },
                );
            }
        }
    }

    by_name.into_values().collect()
}
