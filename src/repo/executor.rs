//! repo::executor
//!
//! Orchestration of multi-step git command sequences per version.
//!
//! # Architecture
//!
//! Every public operation runs inside the lock of its version name, so for
//! a given version the complete sequence of one operation (retries
//! included) finishes before the next operation's first step begins.
//! Transport-touching steps (clone, fetch, push) are wrapped in the retry
//! policy; every git outcome is classified into [`RepoError`] at the step
//! where it happened.
//!
//! Locked public methods delegate to `*_locked` helpers that assume the lock
//! is already held, because the per-version lock is not reentrant.
//!
//! # State
//!
//! The only state is the filesystem: a version is cloned iff its directory
//! exists under the root. Process restarts are therefore safe.
//!
//! A mutation that pushes leaves HEAD on the commit it just pushed, so the
//! working copy already holds the latest ref without a further fetch.
//!
//! # Example
//!
//! ```no_run
//! use registry_vcs::core::types::{ChangeId, RefName, VersionName};
//! use registry_vcs::repo::{CommandExecutor, ExecutorSettings};
//!
//! let settings = ExecutorSettings::new("/srv/repos", "master")
//!     .unwrap()
//!     .with_remote("https://review.example.com/registry");
//! let executor = CommandExecutor::new(settings);
//!
//! let version = VersionName::new("42").unwrap();
//! executor.ensure_cloned(&version).unwrap();
//! executor
//!     .amend_file(
//!         &version,
//!         &RefName::new("refs/changes/42/42/1").unwrap(),
//!         "Edit form",
//!         &ChangeId::new("I42").unwrap(),
//!         "forms/a.json",
//!         "{}",
//!     )
//!     .unwrap();
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use super::dates::FileDatesCache;
use super::error::{classify, RepoError, Step};
use crate::core::config::{Config, ConfigError};
use crate::core::ops::lock::LockRegistry;
use crate::core::ops::retry::RetryPolicy;
use crate::core::paths::{normalize_repo_path, RepoPaths};
use crate::core::types::{BranchName, ChangeId, FileDates, Oid, RefName, TypeError, VersionName};
use crate::git::{Credentials, Git, GitError, Identity, ORIGIN};

/// Resolved settings for a [`CommandExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Directory holding one working copy per version
    pub root: PathBuf,
    /// Clone URL (`<base_url>/<repository>`)
    pub remote_url: Option<String>,
    /// Plaintext credentials for the remote
    pub credentials: Option<Credentials>,
    /// Stable branch; also the version name of its working copy
    pub stable_branch: BranchName,
    /// Identity recorded on commits
    pub author: Identity,
    /// Total attempts for transport steps
    pub max_attempts: u32,
}

impl ExecutorSettings {
    /// Settings with defaults for everything but the root and stable branch.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` if `stable_branch` is not both a valid branch
    /// name and a valid version name.
    pub fn new(root: impl Into<PathBuf>, stable_branch: &str) -> Result<Self, TypeError> {
        VersionName::new(stable_branch)?;
        Ok(Self {
            root: root.into(),
            remote_url: None,
            credentials: None,
            stable_branch: BranchName::new(stable_branch)?,
            author: Identity::new(
                crate::core::config::DEFAULT_AUTHOR_NAME,
                crate::core::config::DEFAULT_AUTHOR_EMAIL,
            ),
            max_attempts: crate::core::ops::retry::DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Set the clone URL.
    pub fn with_remote(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }

    /// Set plaintext credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Resolve settings from a loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut settings = Self::new(config.root(), config.stable_branch())
            .map_err(|e| ConfigError::InvalidValue(format!("invalid stable branch: {}", e)))?;
        settings.remote_url = config.remote_url();
        settings.credentials = config
            .credentials()
            .map(|(user, pass)| Credentials::new(user, pass));
        settings.author = Identity::new(config.author_name(), config.author_email());
        settings.max_attempts = config.max_attempts();
        Ok(settings)
    }
}

/// Result of [`CommandExecutor::ensure_cloned`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneOutcome {
    /// A fresh clone was created.
    Cloned,
    /// The working copy already existed; nothing was done.
    AlreadyPresent,
}

/// Result of a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publication {
    /// A commit was created (or amended) and pushed.
    Pushed {
        /// The pushed commit
        commit: Oid,
    },
    /// The working tree did not change; nothing was committed or pushed.
    Unchanged,
}

/// Attach the step and version to a git result.
fn at<T>(step: Step, version: &VersionName, result: Result<T, GitError>) -> Result<T, RepoError> {
    result.map_err(|e| classify(step, version, e))
}

/// Runs command sequences against per-version working copies.
#[derive(Debug)]
pub struct CommandExecutor {
    paths: RepoPaths,
    remote_url: Option<String>,
    credentials: Option<Credentials>,
    stable_branch: BranchName,
    author: Identity,
    locks: LockRegistry,
    retry: RetryPolicy,
    dates: FileDatesCache,
}

impl CommandExecutor {
    /// Create an executor from resolved settings.
    pub fn new(settings: ExecutorSettings) -> Self {
        Self {
            paths: RepoPaths::new(settings.root),
            remote_url: settings.remote_url,
            credentials: settings.credentials,
            stable_branch: settings.stable_branch,
            author: settings.author,
            locks: LockRegistry::new(),
            retry: RetryPolicy::new(settings.max_attempts),
            dates: FileDatesCache::new(),
        }
    }

    /// The stable branch.
    pub fn stable_branch(&self) -> &BranchName {
        &self.stable_branch
    }

    /// The file dates cache.
    pub fn date_cache(&self) -> &FileDatesCache {
        &self.dates
    }

    fn creds(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    fn remote_url(&self) -> Result<&str, RepoError> {
        self.remote_url
            .as_deref()
            .ok_or_else(|| RepoError::InvalidConfiguration {
                message: "no remote URL configured".into(),
                source: None,
            })
    }

    fn open(&self, version: &VersionName) -> Result<Git, RepoError> {
        let dir = self.paths.version_dir(version);
        if !dir.is_dir() {
            return Err(RepoError::RepositoryNotFound {
                version: version.to_string(),
                path: dir,
            });
        }
        at(Step::Open, version, Git::open(&dir))
    }

    // =========================================================================
    // Clone and Sync
    // =========================================================================

    /// Clone the remote into the version's directory unless it exists.
    ///
    /// All branches are fetched; the stable branch is checked out.
    pub fn ensure_cloned(&self, version: &VersionName) -> Result<CloneOutcome, RepoError> {
        self.locks
            .with_lock(version.as_str(), || self.ensure_cloned_locked(version))
    }

    fn ensure_cloned_locked(&self, version: &VersionName) -> Result<CloneOutcome, RepoError> {
        let dir = self.paths.version_dir(version);
        if dir.exists() {
            debug!(version = %version, "working copy already present");
            return Ok(CloneOutcome::AlreadyPresent);
        }

        let url = self.remote_url()?;
        std::fs::create_dir_all(self.paths.root()).map_err(|e| RepoError::Operational {
            message: format!("cannot create root {}", self.paths.root().display()),
            source: Some(Box::new(e)),
        })?;

        self.retry.invoke("clone", || {
            let result = Git::clone_all(url, &dir, self.stable_branch.as_str(), self.creds());
            if result.is_err() && dir.exists() {
                debug!(path = %dir.display(), "removing partial clone");
                remove_dir_if_present(&dir).map_err(|e| RepoError::Operational {
                    message: format!("cannot remove partial clone {}", dir.display()),
                    source: Some(Box::new(e)),
                })?;
            }
            at(Step::Clone, version, result).map(|_| ())
        })?;

        info!(version = %version, path = %dir.display(), "cloned working copy");
        Ok(CloneOutcome::Cloned)
    }

    /// Fetch `refname` and check out the fetched commit as a detached HEAD.
    pub fn fetch_ref(&self, version: &VersionName, refname: &RefName) -> Result<Oid, RepoError> {
        self.locks.with_lock(version.as_str(), || {
            let git = self.open(version)?;
            self.fetch_ref_locked(&git, version, refname)
        })
    }

    fn fetch_ref_locked(
        &self,
        git: &Git,
        version: &VersionName,
        refname: &RefName,
    ) -> Result<Oid, RepoError> {
        self.retry.invoke("fetch", || {
            at(
                Step::Fetch,
                version,
                git.fetch(ORIGIN, &[refname.as_str()], self.creds()),
            )
        })?;
        let oid = at(Step::Fetch, version, git.fetch_head_oid(refname.as_str()))?;
        at(Step::Checkout, version, git.checkout_detached(&oid))?;
        debug!(version = %version, refname = %refname, commit = %oid.short(7), "checked out fetched ref");
        Ok(oid)
    }

    /// Fetch everything and hard-reset the local branch named like the
    /// version onto `origin/<version>`.
    pub fn reset_head_to_remote(&self, version: &VersionName) -> Result<Oid, RepoError> {
        self.locks.with_lock(version.as_str(), || {
            let git = self.open(version)?;
            let branch = BranchName::new(version.as_str())
                .map_err(|e| RepoError::InvalidArgument(e.to_string()))?;
            self.reset_to_remote_locked(&git, version, &branch)
        })
    }

    fn reset_to_remote_locked(
        &self,
        git: &Git,
        version: &VersionName,
        branch: &BranchName,
    ) -> Result<Oid, RepoError> {
        self.retry.invoke("fetch", || {
            at(Step::Fetch, version, git.fetch(ORIGIN, &[], self.creds()))
        })?;
        let oid = at(Step::Reset, version, git.reset_branch_to_remote(branch))?;
        debug!(version = %version, branch = %branch, commit = %oid.short(7), "reset to remote");
        Ok(oid)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Write `content` to `path` on top of `refname` and amend the change.
    ///
    /// Returns [`Publication::Unchanged`] when the content is already there.
    pub fn amend_file(
        &self,
        version: &VersionName,
        refname: &RefName,
        message: &str,
        change_id: &ChangeId,
        path: &str,
        content: &str,
    ) -> Result<Publication, RepoError> {
        let path = normalize_repo_path(path)?;
        self.locks.with_lock(version.as_str(), || {
            let git = self.open(version)?;
            self.fetch_ref_locked(&git, version, refname)?;

            at(Step::Write, version, git.write_worktree_file(&path, content.as_bytes()))?;
            if at(Step::Write, version, git.is_worktree_clean())? {
                debug!(version = %version, path = %path, "content unchanged, nothing to amend");
                return Ok(Publication::Unchanged);
            }
            at(Step::Stage, version, git.stage_path(&path))?;

            self.amend_and_push_locked(&git, version, &change_id.apply_to(message))
        })
    }

    /// Remove `path` on top of `refname` and amend the change.
    pub fn delete_file(
        &self,
        version: &VersionName,
        path: &str,
        refname: &RefName,
        message: &str,
        change_id: &ChangeId,
    ) -> Result<Publication, RepoError> {
        let path = normalize_repo_path(path)?;
        self.locks.with_lock(version.as_str(), || {
            let git = self.open(version)?;
            self.fetch_ref_locked(&git, version, refname)?;

            if at(Step::Stage, version, git.is_tracked(&path))? {
                at(Step::Delete, version, git.remove_worktree_file(&path))?;
                at(Step::Stage, version, git.stage_removal(&path))?;
            }
            if at(Step::Delete, version, git.is_worktree_clean())? {
                debug!(version = %version, path = %path, "file not tracked, nothing to delete");
                return Ok(Publication::Unchanged);
            }

            self.amend_and_push_locked(&git, version, &change_id.apply_to(message))
        })
    }

    /// Undo the last commit's change to `path`.
    ///
    /// If the parent commit has the file, its content is restored;
    /// otherwise the file is removed. The amended commit keeps the last
    /// commit's message.
    ///
    /// # Errors
    ///
    /// [`RepoError::FileNotFoundForRollback`] if neither the last commit
    /// nor its parent contains `path`.
    pub fn rollback_file(&self, version: &VersionName, path: &str) -> Result<Publication, RepoError> {
        let path = normalize_repo_path(path)?;
        self.locks.with_lock(version.as_str(), || {
            let git = self.open(version)?;
            let in_head = at(Step::Read, version, git.blob_at_head(&path))?;
            let in_parent = at(Step::Read, version, git.blob_at_head_parent(&path))?;

            match (in_head, in_parent) {
                (None, None) => {
                    return Err(RepoError::FileNotFoundForRollback {
                        version: version.to_string(),
                        path,
                    })
                }
                (_, Some(previous)) => {
                    at(Step::Write, version, git.write_worktree_file(&path, &previous))?;
                    at(Step::Stage, version, git.stage_path(&path))?;
                }
                (Some(_), None) => {
                    at(Step::Delete, version, git.remove_worktree_file(&path))?;
                    at(Step::Stage, version, git.stage_removal(&path))?;
                }
            }

            if at(Step::Stage, version, git.is_worktree_clean())? {
                return Ok(Publication::Unchanged);
            }
            let message = at(Step::Read, version, git.head_commit_info())?.message;
            self.amend_and_push_locked(&git, version, &message)
        })
    }

    fn amend_and_push_locked(
        &self,
        git: &Git,
        version: &VersionName,
        message: &str,
    ) -> Result<Publication, RepoError> {
        let commit = at(Step::Commit, version, git.amend_head(message, &self.author))?;
        at(Step::Remote, version, git.ensure_remote(ORIGIN, self.remote_url()?))?;

        let refspec = format!("HEAD:{}", self.stable_branch.review_ref());
        self.push_locked(git, version, &refspec, Step::Push)?;
        info!(version = %version, commit = %commit.short(7), "amended and pushed for review");
        Ok(Publication::Pushed { commit })
    }

    /// Commit `content` at `path` on top of the remote stable branch and push
    /// it for immediate private submission.
    pub fn commit_and_submit(
        &self,
        version: &VersionName,
        path: &str,
        content: &str,
    ) -> Result<Publication, RepoError> {
        let path = normalize_repo_path(path)?;
        self.locks.with_lock(version.as_str(), || {
            let git = self.open(version)?;
            let base = self.reset_to_remote_locked(&git, version, &self.stable_branch)?;

            at(Step::Write, version, git.write_worktree_file(&path, content.as_bytes()))?;
            if at(Step::Write, version, git.is_worktree_clean())? {
                debug!(version = %version, path = %path, "content unchanged, nothing to submit");
                return Ok(Publication::Unchanged);
            }
            at(Step::Stage, version, git.stage_path(&path))?;

            let change_id = ChangeId::generate(&[
                base.as_str(),
                &path,
                &self.author.email,
                &Utc::now().to_rfc3339(),
            ]);
            let message = change_id.apply_to(&format!("Update {}", path));
            let commit = at(Step::Commit, version, git.commit_on_head(&message, &self.author))?;
            at(Step::Remote, version, git.ensure_remote(ORIGIN, self.remote_url()?))?;

            let refspec = format!("HEAD:{}", self.stable_branch.submit_ref());
            self.push_locked(&git, version, &refspec, Step::Submit)?;
            info!(version = %version, commit = %commit.short(7), "committed and submitted");
            Ok(Publication::Pushed { commit })
        })
    }

    fn push_locked(
        &self,
        git: &Git,
        version: &VersionName,
        refspec: &str,
        step: Step,
    ) -> Result<(), RepoError> {
        self.retry.invoke("push", || {
            at(step, version, git.push(ORIGIN, refspec, self.creds()))
        })
    }

    /// Remove the version's working copy. Absence is not an error.
    pub fn delete_repo(&self, version: &VersionName) -> Result<(), RepoError> {
        self.locks.with_lock(version.as_str(), || {
            let dir = self.paths.version_dir(version);
            let removed = remove_dir_if_present(&dir).map_err(|e| RepoError::Operational {
                message: format!("cannot remove {}", dir.display()),
                source: Some(Box::new(e)),
            })?;
            let evicted = self.dates.evict_version(version.as_str());
            if removed {
                info!(version = %version, evicted, "deleted working copy");
            } else {
                debug!(version = %version, "no working copy to delete");
            }
            Ok(())
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether the version's working copy exists.
    pub fn repo_exists(&self, version: &VersionName) -> bool {
        self.locks
            .with_lock(version.as_str(), || self.paths.version_dir(version).is_dir())
    }

    /// Names of files directly inside directory `path` of HEAD.
    ///
    /// A path missing from the tree yields an empty list.
    ///
    /// # Errors
    ///
    /// [`RepoError::InvalidArgument`] if `path` is empty.
    pub fn list_files_under_path(
        &self,
        version: &VersionName,
        path: &str,
    ) -> Result<Vec<String>, RepoError> {
        let dir = normalize_repo_path(path)?;
        self.list_directory(version, &dir)
    }

    /// Like [`Self::list_files_under_path`], but an empty `dir` lists the root.
    pub(crate) fn list_directory(
        &self,
        version: &VersionName,
        dir: &str,
    ) -> Result<Vec<String>, RepoError> {
        self.locks.with_lock(version.as_str(), || {
            let git = self.open(version)?;
            let names = at(Step::Read, version, git.list_tree_dir(dir))?;
            Ok(names.unwrap_or_default())
        })
    }

    /// Content of `path` in HEAD, or `None` if absent.
    pub fn read_file_content(
        &self,
        version: &VersionName,
        path: &str,
    ) -> Result<Option<String>, RepoError> {
        let path = normalize_repo_path(path)?;
        self.locks.with_lock(version.as_str(), || {
            let git = self.open(version)?;
            at(Step::Read, version, git.read_head_file(&path))
        })
    }

    /// First and last commit times of `path`, cached per (version, path).
    ///
    /// Returns `None` when no commit touches the path; that answer is not
    /// cached.
    pub fn file_dates(
        &self,
        version: &VersionName,
        path: &str,
    ) -> Result<Option<FileDates>, RepoError> {
        let path = normalize_repo_path(path)?;
        if let Some(dates) = self.dates.get(version.as_str(), &path) {
            return Ok(Some(dates));
        }

        self.locks.with_lock(version.as_str(), || {
            let git = self.open(version)?;
            let dates = at(Step::History, version, git.path_history_times(&path))?;
            if let Some(dates) = dates {
                self.dates.insert(version.as_str(), &path, dates);
            }
            Ok(dates)
        })
    }

    /// Paths that would conflict when merging `target` into HEAD.
    ///
    /// The probe leaves HEAD, index and working tree untouched.
    pub fn merge_conflicts(
        &self,
        version: &VersionName,
        target: &str,
    ) -> Result<Vec<String>, RepoError> {
        if target.trim().is_empty() {
            return Err(RepoError::InvalidArgument("merge target cannot be empty".into()));
        }
        self.locks.with_lock(version.as_str(), || {
            let git = self.open(version)?;
            let conflicts = at(Step::Merge, version, git.merge_conflicts(target))?;
            debug!(version = %version, target, count = conflicts.len(), "merge probe finished");
            Ok(conflicts)
        })
    }
}

/// Remove a directory tree; returns whether it existed.
fn remove_dir_if_present(dir: &Path) -> std::io::Result<bool> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
