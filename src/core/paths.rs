//! core::paths
//!
//! Centralized path routing for per-version working copies.
//!
//! # Storage Layout
//!
//! Every version lives in its own clone directly under the configured root:
//! - `<root>/<stable_branch>/` - Working copy tracking the stable branch
//! - `<root>/<change_number>/` - Working copy checked out at a change ref
//!
//! **Hard rule:** No code outside this module may join a version name onto
//! the root. Version names are validated single path components, so a
//! version directory can never escape the root.
//!
//! # Example
//!
//! ```
//! use registry_vcs::core::paths::RepoPaths;
//! use registry_vcs::core::types::VersionName;
//! use std::path::PathBuf;
//!
//! let paths = RepoPaths::new("/var/lib/registry/repositories");
//! let version = VersionName::new("42").unwrap();
//!
//! assert_eq!(
//!     paths.version_dir(&version),
//!     PathBuf::from("/var/lib/registry/repositories/42")
//! );
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::VersionName;

/// Errors from repository-relative path normalization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path cannot be empty")]
    Empty,

    #[error("path '{0}' contains a forbidden component")]
    ForbiddenComponent(String),
}

/// Root under which all version working copies live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPaths {
    root: PathBuf,
}

impl RepoPaths {
    /// Create path routing for the given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Working copy directory of a version.
    pub fn version_dir(&self, version: &VersionName) -> PathBuf {
        self.root.join(version.as_str())
    }
}

/// Normalize a repository-relative path to slash-separated form.
///
/// Leading and trailing slashes are stripped. Empty results, `.`/`..`
/// components, empty components and backslashes are rejected so the path
/// always stays inside the working copy.
///
/// ```
/// use registry_vcs::core::paths::normalize_repo_path;
///
/// assert_eq!(normalize_repo_path("/forms/a.json").unwrap(), "forms/a.json");
/// assert!(normalize_repo_path("../secret").is_err());
/// assert!(normalize_repo_path("/").is_err());
/// ```
pub fn normalize_repo_path(path: &str) -> Result<String, PathError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }
    let bad_component = trimmed
        .split('/')
        .any(|c| c.is_empty() || c == "." || c == ".." || c.contains('\\') || c == ".git");
    if bad_component {
        return Err(PathError::ForbiddenComponent(path.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Split a normalized path into its parent directory and base name.
///
/// Files at the repository root have an empty parent.
pub fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_dirs_are_children_of_root() {
        let paths = RepoPaths::new("/root/repos");
        let master = VersionName::new("master").unwrap();
        assert_eq!(paths.version_dir(&master), PathBuf::from("/root/repos/master"));
        assert_eq!(paths.root(), Path::new("/root/repos"));
    }

    mod normalize {
        use super::*;

        #[test]
        fn strips_slashes() {
            assert_eq!(normalize_repo_path("forms").unwrap(), "forms");
            assert_eq!(normalize_repo_path("/forms/").unwrap(), "forms");
            assert_eq!(normalize_repo_path("a/b/c.json").unwrap(), "a/b/c.json");
        }

        #[test]
        fn rejects_escapes() {
            assert_eq!(normalize_repo_path(""), Err(PathError::Empty));
            assert_eq!(normalize_repo_path("//"), Err(PathError::Empty));
            assert!(normalize_repo_path("a/../b").is_err());
            assert!(normalize_repo_path("./a").is_err());
            assert!(normalize_repo_path("a//b").is_err());
            assert!(normalize_repo_path("a\\b").is_err());
            assert!(normalize_repo_path(".git/config").is_err());
        }
    }

    #[test]
    fn split_parent_handles_root_files() {
        assert_eq!(split_parent("forms/a.json"), ("forms", "a.json"));
        assert_eq!(split_parent("a/b/c"), ("a/b", "c"));
        assert_eq!(split_parent("top.json"), ("", "top.json"));
    }
}
