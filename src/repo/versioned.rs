//! repo::versioned
//!
//! File views of one version: the stable branch or an open review change.
//!
//! # Variants
//!
//! [`VersionedRepository`] is a closed union selected at construction.
//! Only [`ChangeRepository`] has `write` and `delete`, so a write against
//! the stable branch does not type-check instead of failing at runtime.
//!
//! | | Stable | Change |
//! |---|---|---|
//! | `pull_latest` | clone if absent | clone if absent, then check out the change's current ref |
//! | `list` | local tree | local tree reconciled with the change's file statuses |
//! | `read` | local tree | local tree |
//! | `exists` | local tree | reconciled listing, `DELETED` counts as absent |

use std::sync::Arc;

use tracing::debug;

use super::error::{classify_review, RepoError, ReviewOp};
use super::executor::{CommandExecutor, Publication};
use super::reconcile::reconcile;
use crate::core::paths::{normalize_repo_path, split_parent};
use crate::core::types::{FileEntry, VersionName};
use crate::review::{ChangeInfo, ReviewService};

/// Normalize a directory argument; empty or `/` means the root.
fn directory(path: &str) -> Result<String, RepoError> {
    if path.trim_matches('/').is_empty() {
        return Ok(String::new());
    }
    Ok(normalize_repo_path(path)?)
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Tree entries of `dir` without dates.
fn local_names(
    executor: &CommandExecutor,
    version: &VersionName,
    dir: &str,
) -> Result<Vec<FileEntry>, RepoError> {
    Ok(executor
        .list_directory(version, dir)?
        .into_iter()
        .map(|name| {
            let path = join(dir, &name);
            FileEntry::current(name, path)
        })
        .collect())
}

/// Tree entries of `dir`, each with its cached commit dates.
fn local_entries(
    executor: &CommandExecutor,
    version: &VersionName,
    dir: &str,
) -> Result<Vec<FileEntry>, RepoError> {
    local_names(executor, version, dir)?
        .into_iter()
        .map(|entry| {
            let dates = executor.file_dates(version, &entry.path)?;
            Ok(entry.with_dates(dates))
        })
        .collect()
}

/// Read-only view of the stable branch.
#[derive(Debug, Clone)]
pub struct StableRepository {
    executor: Arc<CommandExecutor>,
    version: VersionName,
}

impl StableRepository {
    pub fn new(executor: Arc<CommandExecutor>, version: VersionName) -> Self {
        Self { executor, version }
    }

    /// Clone if absent. Refreshing the stable branch is scheduled elsewhere.
    pub fn pull_latest(&self) -> Result<(), RepoError> {
        self.executor.ensure_cloned(&self.version)?;
        Ok(())
    }

    pub fn list(&self, path: &str) -> Result<Vec<FileEntry>, RepoError> {
        let dir = directory(path)?;
        local_entries(&self.executor, &self.version, &dir)
    }

    pub fn read(&self, path: &str) -> Result<Option<String>, RepoError> {
        self.executor.read_file_content(&self.version, path)
    }

    pub fn exists(&self, path: &str) -> Result<bool, RepoError> {
        let path = normalize_repo_path(path)?;
        let (dir, name) = split_parent(&path);
        let names = self.executor.list_directory(&self.version, dir)?;
        Ok(names.iter().any(|n| n == name))
    }
}

/// Read-write view of an open review change.
#[derive(Clone)]
pub struct ChangeRepository {
    executor: Arc<CommandExecutor>,
    review: Arc<dyn ReviewService>,
    version: VersionName,
}

impl std::fmt::Debug for ChangeRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeRepository")
            .field("version", &self.version)
            .field("review", &self.review.name())
            .finish()
    }
}

impl ChangeRepository {
    pub fn new(
        executor: Arc<CommandExecutor>,
        review: Arc<dyn ReviewService>,
        version: VersionName,
    ) -> Self {
        Self {
            executor,
            review,
            version,
        }
    }

    fn change_info(&self) -> Result<ChangeInfo, RepoError> {
        self.review
            .change_info(&self.version)
            .map_err(|e| RepoError::review(ReviewOp::ChangeInfo, e))
    }

    /// Clone if absent, then check out the change's current revision.
    pub fn pull_latest(&self) -> Result<(), RepoError> {
        self.executor.ensure_cloned(&self.version)?;
        let info = self.change_info()?;
        self.executor.fetch_ref(&self.version, &info.current_ref)?;
        Ok(())
    }

    fn reconciled(&self, dir: &str, local: Vec<FileEntry>) -> Result<Vec<FileEntry>, RepoError> {
        let diffs = self
            .review
            .file_statuses(&self.version)
            .map_err(|e| RepoError::review(ReviewOp::FileStatuses, e))?;
        let merged = reconcile(dir, local, &diffs);
        debug!(version = %self.version, dir = %dir, entries = merged.len(), "reconciled listing");
        Ok(merged)
    }

    /// Directory listing with review statuses.
    pub fn list(&self, path: &str) -> Result<Vec<FileEntry>, RepoError> {
        let dir = directory(path)?;
        let local = local_entries(&self.executor, &self.version, &dir)?;
        self.reconciled(&dir, local)
    }

    pub fn read(&self, path: &str) -> Result<Option<String>, RepoError> {
        self.executor.read_file_content(&self.version, path)
    }

    /// Whether `path` is present in the change (not deleted by it).
    ///
    /// Reconciles names only; no file dates are computed.
    pub fn exists(&self, path: &str) -> Result<bool, RepoError> {
        let path = normalize_repo_path(path)?;
        let (dir, name) = split_parent(&path);
        let local = local_names(&self.executor, &self.version, dir)?;
        Ok(self
            .reconciled(dir, local)?
            .iter()
            .any(|entry| entry.name == name && entry.is_present()))
    }

    /// Amend the change with new content at `path`.
    ///
    /// Subject, Change-Id and current ref are read fresh from the review
    /// service.
    pub fn write(&self, path: &str, content: &str) -> Result<Publication, RepoError> {
        let info = self.change_info()?;
        self.executor.amend_file(
            &self.version,
            &info.current_ref,
            &info.subject,
            &info.change_id,
            path,
            content,
        )
    }

    /// Amend the change with `path` removed.
    pub fn delete(&self, path: &str) -> Result<Publication, RepoError> {
        let info = self.change_info()?;
        self.executor.delete_file(
            &self.version,
            path,
            &info.current_ref,
            &info.subject,
            &info.change_id,
        )
    }

    /// Ask the review service to rebase the change. An up-to-date change is
    /// not an error.
    pub fn rebase(&self) -> Result<(), RepoError> {
        classify_review(ReviewOp::Rebase, &self.version, self.review.rebase(&self.version))
    }

    /// Ask the review service to submit the change.
    pub fn submit(&self) -> Result<(), RepoError> {
        classify_review(ReviewOp::Submit, &self.version, self.review.submit(&self.version))
    }
}

/// A version's file view.
#[derive(Debug, Clone)]
pub enum VersionedRepository {
    Stable(StableRepository),
    Change(ChangeRepository),
}

impl VersionedRepository {
    /// The version name.
    pub fn id(&self) -> &VersionName {
        match self {
            VersionedRepository::Stable(r) => &r.version,
            VersionedRepository::Change(r) => &r.version,
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, VersionedRepository::Stable(_))
    }

    /// The change view, if this is one.
    pub fn as_change(&self) -> Option<&ChangeRepository> {
        match self {
            VersionedRepository::Change(r) => Some(r),
            VersionedRepository::Stable(_) => None,
        }
    }

    pub fn pull_latest(&self) -> Result<(), RepoError> {
        match self {
            VersionedRepository::Stable(r) => r.pull_latest(),
            VersionedRepository::Change(r) => r.pull_latest(),
        }
    }

    pub fn list(&self, path: &str) -> Result<Vec<FileEntry>, RepoError> {
        match self {
            VersionedRepository::Stable(r) => r.list(path),
            VersionedRepository::Change(r) => r.list(path),
        }
    }

    pub fn read(&self, path: &str) -> Result<Option<String>, RepoError> {
        match self {
            VersionedRepository::Stable(r) => r.read(path),
            VersionedRepository::Change(r) => r.read(path),
        }
    }

    pub fn exists(&self, path: &str) -> Result<bool, RepoError> {
        match self {
            VersionedRepository::Stable(r) => r.exists(path),
            VersionedRepository::Change(r) => r.exists(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ChangeId, RefName};
    use crate::repo::error::ErrorKind;
    use crate::repo::executor::ExecutorSettings;
    use crate::review::mock::{FailOn, MockOperation, MockReviewService};
    use crate::review::ReviewError;
    use tempfile::TempDir;

    fn v(name: &str) -> VersionName {
        VersionName::new(name).unwrap()
    }

    fn executor(root: &std::path::Path) -> Arc<CommandExecutor> {
        Arc::new(CommandExecutor::new(
            ExecutorSettings::new(root, "master").unwrap(),
        ))
    }

    fn change(number: u64) -> ChangeInfo {
        ChangeInfo {
            number,
            change_id: ChangeId::new(format!("I{number}")).unwrap(),
            current_ref: RefName::new(format!("refs/changes/{number}/{number}/1")).unwrap(),
            subject: "Edit".into(),
        }
    }

    #[test]
    fn directory_argument() {
        assert_eq!(directory("").unwrap(), "");
        assert_eq!(directory("/").unwrap(), "");
        assert_eq!(directory("/forms/").unwrap(), "forms");
        assert!(directory("forms/../x").is_err());
    }

    #[test]
    fn join_paths() {
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("forms", "a"), "forms/a");
    }

    #[test]
    fn variant_accessors() {
        let temp = TempDir::new().unwrap();
        let exec = executor(temp.path());
        let stable = VersionedRepository::Stable(StableRepository::new(exec.clone(), v("master")));
        let change = VersionedRepository::Change(ChangeRepository::new(
            exec,
            Arc::new(MockReviewService::new()),
            v("42"),
        ));

        assert!(stable.is_stable());
        assert!(stable.as_change().is_none());
        assert_eq!(change.id().as_str(), "42");
        assert!(change.as_change().is_some());
    }

    #[test]
    fn write_fails_on_unknown_change() {
        let temp = TempDir::new().unwrap();
        let repo = ChangeRepository::new(
            executor(temp.path()),
            Arc::new(MockReviewService::new()),
            v("42"),
        );
        let err = repo.write("forms/a.json", "{}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Review);
    }

    #[test]
    fn rebase_conflict_is_benign() {
        let temp = TempDir::new().unwrap();
        let review = MockReviewService::new()
            .with_change(change(42), [])
            .fail_on(FailOn::Rebase(ReviewError::ApiError {
                status: 409,
                message: "up to date".into(),
            }));
        let repo = ChangeRepository::new(executor(temp.path()), Arc::new(review.clone()), v("42"));

        repo.rebase().unwrap();
        assert_eq!(
            review.operations(),
            vec![MockOperation::Rebase {
                version: "42".into()
            }]
        );
    }

    #[test]
    fn submit_conflict_is_domain_conflict() {
        let temp = TempDir::new().unwrap();
        let review = MockReviewService::new()
            .with_change(change(42), [])
            .fail_on(FailOn::Submit(ReviewError::ApiError {
                status: 409,
                message: "needs rebase".into(),
            }));
        let repo = ChangeRepository::new(executor(temp.path()), Arc::new(review), v("42"));

        assert_eq!(repo.submit().unwrap_err().kind(), ErrorKind::DomainConflict);
    }

    #[test]
    fn listing_without_clone_is_not_found() {
        let temp = TempDir::new().unwrap();
        let repo = StableRepository::new(executor(temp.path()), v("master"));
        assert_eq!(repo.list("forms").unwrap_err().kind(), ErrorKind::NotFound);
    }
}
