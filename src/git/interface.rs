//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations. All
//! repository reads, writes and transport calls flow through [`Git`], which
//! returns strong types and normalizes every `git2::Error` into a finite set
//! of [`GitError`] outcomes. Callers match on outcomes, never on git2 error
//! codes or messages.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed outcomes:
//! - [`GitError::NotARepo`]: Directory is not a repository
//! - [`GitError::Transport`]: Network-level failure (worth retrying)
//! - [`GitError::Auth`] / [`GitError::InvalidRemote`]: Misconfiguration
//! - [`GitError::CheckoutConflict`] / [`GitError::Locked`]: The working copy
//!   is not in the state a single writer expects
//! - [`GitError::NonFastForward`] / [`GitError::PushRejected`]: The remote
//!   refused the update
//!
//! # Example
//!
//! ```ignore
//! use registry_vcs::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("repositories/42"))?;
//! let head = git.head_commit_info()?;
//! println!("42 is at {} ({})", head.oid.short(7), head.summary);
//! ```

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::types::{BranchName, FileDates, Oid, TypeError};

/// Name of the single remote every working copy uses.
pub const ORIGIN: &str = "origin";

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Directory is not a git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Object not found in repository.
    #[error("object not found: {what}")]
    ObjectNotFound {
        /// Description of the missing object
        what: String,
    },

    /// Network-level failure talking to the remote.
    #[error("transport failure: {message}")]
    Transport {
        /// Description of the failure
        message: String,
    },

    /// The remote rejected the credentials.
    #[error("authentication failed: {message}")]
    Auth {
        /// Description of the failure
        message: String,
    },

    /// The remote URL is malformed or unreachable by design.
    #[error("invalid remote: {message}")]
    InvalidRemote {
        /// Description of the problem
        message: String,
    },

    /// Checkout or reset would overwrite local modifications.
    #[error("checkout conflict: {message}")]
    CheckoutConflict {
        /// Description of the conflict
        message: String,
    },

    /// A repository lock file is held by someone else.
    #[error("repository is locked: {message}")]
    Locked {
        /// Description of the lock
        message: String,
    },

    /// Remote ref moved and the update is not a fast-forward.
    #[error("non-fast-forward update of {refname}")]
    NonFastForward {
        /// The rejected ref
        refname: String,
    },

    /// Remote refused a ref update for another reason.
    #[error("push of {refname} rejected: {message}")]
    PushRejected {
        /// The rejected ref
        refname: String,
        /// Message reported by the remote
        message: String,
    },

    /// File content is not valid UTF-8.
    #[error("file is not valid UTF-8: {path}")]
    InvalidUtf8 {
        /// Repository-relative path
        path: String,
    },

    /// Filesystem error inside the working copy.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// The path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        use git2::{ErrorClass, ErrorCode};

        let message = format!("{}: {}", context, err.message());
        let lowered = err.message().to_ascii_lowercase();

        if matches!(err.code(), ErrorCode::Auth | ErrorCode::Certificate) {
            return GitError::Auth { message };
        }
        if lowered.contains("unsupported url protocol")
            || lowered.contains("malformed")
            || lowered.contains("invalid url")
        {
            return GitError::InvalidRemote { message };
        }
        if matches!(
            err.class(),
            ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssh | ErrorClass::Ssl
        ) || err.code() == ErrorCode::Eof
        {
            return GitError::Transport { message };
        }

        match err.code() {
            ErrorCode::Conflict | ErrorCode::MergeConflict => GitError::CheckoutConflict { message },
            ErrorCode::Locked => GitError::Locked { message },
            ErrorCode::NotFound => GitError::RefNotFound {
                refname: context.to_string(),
            },
            ErrorCode::NotFastForward => GitError::NonFastForward {
                refname: context.to_string(),
            },
            _ => GitError::Internal { message },
        }
    }

    /// Whether this error is a network-level failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, GitError::Transport { .. })
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        GitError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        GitError::Internal {
            message: err.to_string(),
        }
    }
}

/// Plaintext username/password for the remote.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username
    pub username: String,
    /// Password or HTTP token
    pub password: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Name and email recorded on commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
}

impl Identity {
    /// Create an identity.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    fn signature(&self) -> Result<git2::Signature<'static>, GitError> {
        git2::Signature::now(&self.name, &self.email)
            .map_err(|e| GitError::from_git2(e, "signature"))
    }
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// First line of the commit message
    pub summary: String,
    /// Full commit message
    pub message: String,
    /// Number of parents
    pub parent_count: usize,
}

/// Build remote callbacks carrying optional plaintext credentials.
///
/// The credential callback answers once; a second request means the remote
/// rejected the credentials, which is reported as an auth error instead of
/// looping forever.
fn remote_callbacks(creds: Option<&Credentials>) -> git2::RemoteCallbacks<'_> {
    let mut callbacks = git2::RemoteCallbacks::new();
    if let Some(creds) = creds {
        let mut asked = false;
        callbacks.credentials(move |_url, _username_from_url, allowed| {
            if asked {
                return Err(git2::Error::new(
                    git2::ErrorCode::Auth,
                    git2::ErrorClass::Http,
                    "credentials rejected by remote",
                ));
            }
            asked = true;
            if allowed.is_user_pass_plaintext() {
                git2::Cred::userpass_plaintext(&creds.username, &creds.password)
            } else {
                Err(git2::Error::new(
                    git2::ErrorCode::Auth,
                    git2::ErrorClass::Net,
                    "remote does not accept username/password credentials",
                ))
            }
        });
    }
    callbacks
}

fn fetch_options(creds: Option<&Credentials>) -> git2::FetchOptions<'_> {
    let mut options = git2::FetchOptions::new();
    options.remote_callbacks(remote_callbacks(creds));
    options
}

fn to_oid(id: git2::Oid) -> Result<Oid, GitError> {
    Ok(Oid::new(id.to_string())?)
}

fn to_utc(time: git2::Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.seconds(), 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Id of the tree entry at `path`, if present.
fn entry_id(tree: &git2::Tree<'_>, path: &str) -> Option<git2::Oid> {
    tree.get_path(Path::new(path)).ok().map(|e| e.id())
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. All working copy
/// reads, writes and remote calls flow through this interface. No other
/// module imports `git2` directly.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Opening and Cloning
    // =========================================================================

    /// Open the working copy at exactly `path`.
    ///
    /// Unlike discovery, parent directories are never searched, so a missing
    /// version directory inside some outer repository is still reported.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if `path` is not a non-bare repository
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        if repo.is_bare() {
            return Err(GitError::NotARepo {
                path: path.to_path_buf(),
            });
        }
        Ok(Self { repo })
    }

    /// Clone every branch of `url` into `dest`, checking out `branch`.
    ///
    /// A remote that does not exist (or lacks `branch`) is reported as
    /// [`GitError::InvalidRemote`].
    pub fn clone_all(
        url: &str,
        dest: &Path,
        branch: &str,
        creds: Option<&Credentials>,
    ) -> Result<Self, GitError> {
        let mut builder = git2::build::RepoBuilder::new();
        builder.branch(branch);
        builder.fetch_options(fetch_options(creds));

        let repo = builder.clone(url, dest).map_err(|e| {
            let context = format!("clone {}", url);
            match GitError::from_git2(e, &context) {
                GitError::RefNotFound { .. } => GitError::InvalidRemote {
                    message: format!("{}: repository or branch '{}' not found", context, branch),
                },
                other => other,
            }
        })?;
        Ok(Self { repo })
    }

    /// Working directory of this repository.
    pub fn workdir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or_else(|| GitError::NotARepo {
            path: self.repo.path().to_path_buf(),
        })
    }

    fn worktree_path(&self, rel: &str) -> Result<PathBuf, GitError> {
        let mut path = self.workdir()?.to_path_buf();
        path.extend(rel.split('/'));
        Ok(path)
    }

    // =========================================================================
    // Remotes and Transport
    // =========================================================================

    /// Make sure remote `name` exists and points at `url`.
    ///
    /// Creates the remote if absent and rewrites its URL if it differs.
    pub fn ensure_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) if remote.url() == Some(url) => Ok(()),
            Ok(_) => self
                .repo
                .remote_set_url(name, url)
                .map_err(|e| GitError::from_git2(e, name)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => self
                .repo
                .remote(name, url)
                .map(|_| ())
                .map_err(|e| GitError::from_git2(e, name)),
            Err(e) => Err(GitError::from_git2(e, name)),
        }
    }

    /// Fetch `refspecs` from `remote`; an empty list fetches the configured ones.
    pub fn fetch(
        &self,
        remote: &str,
        refspecs: &[&str],
        creds: Option<&Credentials>,
    ) -> Result<(), GitError> {
        let mut handle = self
            .repo
            .find_remote(remote)
            .map_err(|e| GitError::from_git2(e, remote))?;
        let mut options = fetch_options(creds);
        let context = if refspecs.is_empty() {
            format!("fetch {}", remote)
        } else {
            format!("fetch {}", refspecs.join(" "))
        };
        handle
            .fetch(refspecs, Some(&mut options), None)
            .map_err(|e| GitError::from_git2(e, &context))
    }

    /// Commit recorded in FETCH_HEAD for `refname`.
    ///
    /// Falls back to the first FETCH_HEAD entry when none is labelled with
    /// `refname`.
    pub fn fetch_head_oid(&self, refname: &str) -> Result<Oid, GitError> {
        let mut matched = None;
        let mut first = None;
        self.repo
            .fetchhead_foreach(|name, _url, oid, _is_merge| {
                if first.is_none() {
                    first = Some(*oid);
                }
                if name == refname {
                    matched = Some(*oid);
                    return false;
                }
                true
            })
            .map_err(|e| GitError::from_git2(e, "FETCH_HEAD"))?;

        match matched.or(first) {
            Some(id) => to_oid(id),
            None => Err(GitError::RefNotFound {
                refname: format!("FETCH_HEAD for {}", refname),
            }),
        }
    }

    /// Push `refspec` to `remote`.
    ///
    /// Rejections reported per ref by the remote become
    /// [`GitError::NonFastForward`] or [`GitError::PushRejected`].
    pub fn push(
        &self,
        remote: &str,
        refspec: &str,
        creds: Option<&Credentials>,
    ) -> Result<(), GitError> {
        let mut handle = self
            .repo
            .find_remote(remote)
            .map_err(|e| GitError::from_git2(e, remote))?;
        let target = refspec.rsplit(':').next().unwrap_or(refspec).to_string();
        let rejection: RefCell<Option<String>> = RefCell::new(None);

        {
            let mut callbacks = remote_callbacks(creds);
            callbacks.push_update_reference(|_refname, status| {
                if let Some(msg) = status {
                    *rejection.borrow_mut() = Some(msg.to_string());
                }
                Ok(())
            });
            let mut options = git2::PushOptions::new();
            options.remote_callbacks(callbacks);

            if let Err(e) = handle.push(&[refspec], Some(&mut options)) {
                let msg = e.message().to_ascii_lowercase();
                if msg.contains("non-fast-forward") || msg.contains("fetch first") {
                    return Err(GitError::NonFastForward { refname: target });
                }
                return Err(GitError::from_git2(e, &target));
            }
        }

        match rejection.into_inner() {
            Some(msg) if msg.contains("non-fast-forward") || msg.contains("fetch first") => {
                Err(GitError::NonFastForward { refname: target })
            }
            Some(msg) => Err(GitError::PushRejected {
                refname: target,
                message: msg,
            }),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Checkout and Reset
    // =========================================================================

    /// Check out `oid` as a detached HEAD.
    ///
    /// Uses a safe checkout: local modifications that would be overwritten
    /// produce [`GitError::CheckoutConflict`].
    pub fn checkout_detached(&self, oid: &Oid) -> Result<(), GitError> {
        let id = git2::Oid::from_str(oid.as_str())
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        let commit = self.repo.find_commit(id).map_err(|e| GitError::ObjectNotFound {
            what: format!("commit {}: {}", oid, e.message()),
        })?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.safe();
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        self.repo
            .set_head_detached(id)
            .map_err(|e| GitError::from_git2(e, "HEAD"))
    }

    /// Point local `branch` at `origin/<branch>` and hard-reset onto it.
    ///
    /// The local branch is created if missing and becomes the checked out
    /// branch.
    pub fn reset_branch_to_remote(&self, branch: &BranchName) -> Result<Oid, GitError> {
        let remote_ref = branch.remote_tracking_ref(ORIGIN);
        let target = self
            .repo
            .find_reference(&remote_ref)
            .and_then(|r| r.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, &remote_ref))?;

        let local_ref = branch.local_ref();
        if self.repo.find_reference(&local_ref).is_err() {
            self.repo
                .branch(branch.as_str(), &target, false)
                .map_err(|e| GitError::from_git2(e, &local_ref))?;
        }
        self.repo
            .set_head(&local_ref)
            .map_err(|e| GitError::from_git2(e, &local_ref))?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force();
        self.repo
            .reset(target.as_object(), git2::ResetType::Hard, Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, &remote_ref))?;
        to_oid(target.id())
    }

    // =========================================================================
    // Working Tree and Index
    // =========================================================================

    /// Write `content` to a repository-relative path, creating parents.
    pub fn write_worktree_file(&self, rel: &str, content: &[u8]) -> Result<(), GitError> {
        let path = self.worktree_path(rel)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GitError::io(parent, e))?;
        }
        std::fs::write(&path, content).map_err(|e| GitError::io(&path, e))
    }

    /// Remove a repository-relative file; a missing file is not an error.
    pub fn remove_worktree_file(&self, rel: &str) -> Result<(), GitError> {
        let path = self.worktree_path(rel)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GitError::io(&path, e)),
        }
    }

    /// Whether the working tree and index match HEAD, untracked files included.
    pub fn is_worktree_clean(&self) -> Result<bool, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);
        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "status"))?;
        Ok(statuses.is_empty())
    }

    /// Whether `rel` is tracked in the index.
    pub fn is_tracked(&self, rel: &str) -> Result<bool, GitError> {
        let index = self
            .repo
            .index()
            .map_err(|e| GitError::from_git2(e, "index"))?;
        Ok(index.get_path(Path::new(rel), 0).is_some())
    }

    /// Stage the working tree content of `rel`.
    pub fn stage_path(&self, rel: &str) -> Result<(), GitError> {
        let mut index = self
            .repo
            .index()
            .map_err(|e| GitError::from_git2(e, "index"))?;
        index
            .add_path(Path::new(rel))
            .and_then(|_| index.write())
            .map_err(|e| GitError::from_git2(e, rel))
    }

    /// Stage the removal of `rel`.
    pub fn stage_removal(&self, rel: &str) -> Result<(), GitError> {
        let mut index = self
            .repo
            .index()
            .map_err(|e| GitError::from_git2(e, "index"))?;
        index
            .remove_path(Path::new(rel))
            .and_then(|_| index.write())
            .map_err(|e| GitError::from_git2(e, rel))
    }

    // =========================================================================
    // Commits
    // =========================================================================

    fn head_commit(&self) -> Result<git2::Commit<'_>, GitError> {
        self.repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, "HEAD"))
    }

    fn index_tree(&self) -> Result<git2::Tree<'_>, GitError> {
        let mut index = self
            .repo
            .index()
            .map_err(|e| GitError::from_git2(e, "index"))?;
        let tree_id = index
            .write_tree()
            .map_err(|e| GitError::from_git2(e, "write tree"))?;
        self.repo
            .find_tree(tree_id)
            .map_err(|e| GitError::from_git2(e, "tree"))
    }

    /// Replace HEAD with a commit carrying the staged tree and `message`.
    ///
    /// The original author is kept; `committer` is recorded as committer.
    pub fn amend_head(&self, message: &str, committer: &Identity) -> Result<Oid, GitError> {
        let head = self.head_commit()?;
        let tree = self.index_tree()?;
        let sig = committer.signature()?;
        let id = head
            .amend(Some("HEAD"), None, Some(&sig), None, Some(message), Some(&tree))
            .map_err(|e| GitError::from_git2(e, "amend HEAD"))?;
        to_oid(id)
    }

    /// Create a new commit of the staged tree on top of HEAD.
    pub fn commit_on_head(&self, message: &str, author: &Identity) -> Result<Oid, GitError> {
        let parent = self.head_commit()?;
        let tree = self.index_tree()?;
        let sig = author.signature()?;
        let id = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])
            .map_err(|e| GitError::from_git2(e, "commit"))?;
        to_oid(id)
    }

    /// Information about the HEAD commit.
    pub fn head_commit_info(&self) -> Result<CommitInfo, GitError> {
        let commit = self.head_commit()?;
        Ok(CommitInfo {
            oid: to_oid(commit.id())?,
            summary: commit.summary().unwrap_or("").to_string(),
            message: commit.message().unwrap_or("").to_string(),
            parent_count: commit.parent_count(),
        })
    }

    // =========================================================================
    // Tree Reads
    // =========================================================================

    fn blob_in(&self, tree: &git2::Tree<'_>, rel: &str) -> Result<Option<Vec<u8>>, GitError> {
        let entry = match tree.get_path(Path::new(rel)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(GitError::from_git2(e, rel)),
        };
        if entry.kind() != Some(git2::ObjectType::Blob) {
            return Ok(None);
        }
        let blob = self
            .repo
            .find_blob(entry.id())
            .map_err(|e| GitError::from_git2(e, rel))?;
        Ok(Some(blob.content().to_vec()))
    }

    /// Content of `rel` in the HEAD commit, if it is a file there.
    pub fn blob_at_head(&self, rel: &str) -> Result<Option<Vec<u8>>, GitError> {
        let tree = self
            .head_commit()?
            .tree()
            .map_err(|e| GitError::from_git2(e, "HEAD tree"))?;
        self.blob_in(&tree, rel)
    }

    /// Content of `rel` in HEAD's first parent; `None` for a root commit.
    pub fn blob_at_head_parent(&self, rel: &str) -> Result<Option<Vec<u8>>, GitError> {
        let head = self.head_commit()?;
        if head.parent_count() == 0 {
            return Ok(None);
        }
        let tree = head
            .parent(0)
            .and_then(|p| p.tree())
            .map_err(|e| GitError::from_git2(e, "HEAD^ tree"))?;
        self.blob_in(&tree, rel)
    }

    /// Read `rel` from HEAD as UTF-8.
    pub fn read_head_file(&self, rel: &str) -> Result<Option<String>, GitError> {
        match self.blob_at_head(rel)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| GitError::InvalidUtf8 {
                    path: rel.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Names of files directly inside directory `rel` of the HEAD tree.
    ///
    /// An empty `rel` lists the root. Returns `None` when `rel` is not a
    /// directory in HEAD.
    pub fn list_tree_dir(&self, rel: &str) -> Result<Option<Vec<String>>, GitError> {
        let root = self
            .head_commit()?
            .tree()
            .map_err(|e| GitError::from_git2(e, "HEAD tree"))?;

        let dir = if rel.is_empty() {
            root
        } else {
            let entry = match root.get_path(Path::new(rel)) {
                Ok(entry) => entry,
                Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
                Err(e) => return Err(GitError::from_git2(e, rel)),
            };
            if entry.kind() != Some(git2::ObjectType::Tree) {
                return Ok(None);
            }
            self.repo
                .find_tree(entry.id())
                .map_err(|e| GitError::from_git2(e, rel))?
        };

        let names = dir
            .iter()
            .filter(|e| e.kind() == Some(git2::ObjectType::Blob))
            .filter_map(|e| e.name().map(str::to_string))
            .collect();
        Ok(Some(names))
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Oldest and newest commit times of commits touching `rel`.
    ///
    /// A commit touches the path when its entry at `rel` differs from every
    /// parent's (or, for a root commit, when the path exists). Returns
    /// `None` when no commit reachable from HEAD touches it.
    pub fn path_history_times(&self, rel: &str) -> Result<Option<FileDates>, GitError> {
        let mut walk = self
            .repo
            .revwalk()
            .map_err(|e| GitError::from_git2(e, "revwalk"))?;
        walk.set_sorting(git2::Sort::TIME)
            .and_then(|_| walk.push_head())
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        let mut dates: Option<FileDates> = None;
        for id in walk {
            let id = id.map_err(|e| GitError::from_git2(e, "revwalk"))?;
            let commit = self
                .repo
                .find_commit(id)
                .map_err(|e| GitError::from_git2(e, "commit"))?;
            let tree = commit
                .tree()
                .map_err(|e| GitError::from_git2(e, "commit tree"))?;
            let here = entry_id(&tree, rel);

            let touched = if commit.parent_count() == 0 {
                here.is_some()
            } else {
                commit.parents().all(|parent| {
                    let before = parent.tree().ok().and_then(|t| entry_id(&t, rel));
                    before != here
                })
            };
            if !touched {
                continue;
            }

            let when = to_utc(commit.time());
            dates = Some(match dates {
                None => FileDates {
                    create: when,
                    update: when,
                },
                Some(d) => FileDates {
                    create: d.create.min(when),
                    update: d.update.max(when),
                },
            });
        }
        Ok(dates)
    }

    // =========================================================================
    // Merge Probe
    // =========================================================================

    /// Paths that conflict when merging `revspec` into HEAD.
    ///
    /// The merge is computed in memory; neither the index nor the working
    /// tree is touched. Paths are sorted and unique.
    pub fn merge_conflicts(&self, revspec: &str) -> Result<Vec<String>, GitError> {
        let ours = self.head_commit()?;
        let theirs = self
            .repo
            .revparse_single(revspec)
            .and_then(|o| o.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, revspec))?;

        let index = self
            .repo
            .merge_commits(&ours, &theirs, None)
            .map_err(|e| GitError::from_git2(e, revspec))?;
        if !index.has_conflicts() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let conflicts = index
            .conflicts()
            .map_err(|e| GitError::from_git2(e, "conflicts"))?;
        for conflict in conflicts {
            let conflict = conflict.map_err(|e| GitError::from_git2(e, "conflicts"))?;
            let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
            if let Some(entry) = entry {
                paths.push(String::from_utf8_lossy(&entry.path).into_owned());
            }
        }
        paths.sort();
        paths.dedup();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    mod git_error {
        use super::*;

        fn err(code: git2::ErrorCode, class: git2::ErrorClass, msg: &str) -> GitError {
            GitError::from_git2(git2::Error::new(code, class, msg), "ctx")
        }

        #[test]
        fn auth_codes() {
            let e = err(git2::ErrorCode::Auth, git2::ErrorClass::Http, "denied");
            assert!(matches!(e, GitError::Auth { .. }));
            let e = err(git2::ErrorCode::Certificate, git2::ErrorClass::Ssl, "bad cert");
            assert!(matches!(e, GitError::Auth { .. }));
        }

        #[test]
        fn malformed_urls_are_invalid_remote() {
            let e = err(
                git2::ErrorCode::GenericError,
                git2::ErrorClass::Net,
                "unsupported URL protocol",
            );
            assert!(matches!(e, GitError::InvalidRemote { .. }));
            let e = err(
                git2::ErrorCode::GenericError,
                git2::ErrorClass::Net,
                "malformed URL 'x'",
            );
            assert!(matches!(e, GitError::InvalidRemote { .. }));
        }

        #[test]
        fn network_classes_are_transport() {
            for class in [
                git2::ErrorClass::Net,
                git2::ErrorClass::Http,
                git2::ErrorClass::Ssh,
                git2::ErrorClass::Ssl,
            ] {
                let e = err(git2::ErrorCode::GenericError, class, "connection reset");
                assert!(e.is_transport(), "{:?}", class);
            }
            let e = err(git2::ErrorCode::Eof, git2::ErrorClass::None, "early eof");
            assert!(e.is_transport());
        }

        #[test]
        fn local_outcomes() {
            let e = err(git2::ErrorCode::Conflict, git2::ErrorClass::Checkout, "x");
            assert!(matches!(e, GitError::CheckoutConflict { .. }));
            let e = err(git2::ErrorCode::Locked, git2::ErrorClass::Index, "x");
            assert!(matches!(e, GitError::Locked { .. }));
            let e = err(git2::ErrorCode::NotFound, git2::ErrorClass::Reference, "x");
            assert!(matches!(e, GitError::RefNotFound { .. }));
            let e = err(
                git2::ErrorCode::NotFastForward,
                git2::ErrorClass::Reference,
                "x",
            );
            assert!(matches!(e, GitError::NonFastForward { .. }));
            let e = err(git2::ErrorCode::GenericError, git2::ErrorClass::Odb, "x");
            assert!(matches!(e, GitError::Internal { .. }));
        }

        #[test]
        fn error_display_formatting() {
            let err = GitError::PushRejected {
                refname: "refs/for/master".to_string(),
                message: "prohibited by Gerrit".to_string(),
            };
            assert!(err.to_string().contains("refs/for/master"));
            assert!(err.to_string().contains("prohibited"));
        }
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials::new("admin", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    /// Repository with a few commits, built directly through git2.
    struct Fixture {
        dir: TempDir,
        git: Git,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            git2::Repository::init(dir.path()).unwrap();
            let git = Git::open(dir.path()).unwrap();
            Self { dir, git }
        }

        fn commit(&self, files: &[(&str, Option<&str>)], message: &str, secs: i64) -> Oid {
            for (path, content) in files {
                match content {
                    Some(c) => {
                        self.git.write_worktree_file(path, c.as_bytes()).unwrap();
                        self.git.stage_path(path).unwrap();
                    }
                    None => {
                        self.git.remove_worktree_file(path).unwrap();
                        self.git.stage_removal(path).unwrap();
                    }
                }
            }
            let repo = &self.git.repo;
            let sig = git2::Signature::new("T", "t@example.com", &git2::Time::new(secs, 0)).unwrap();
            let tree = self.git.index_tree().unwrap();
            let parents: Vec<git2::Commit<'_>> = repo
                .head()
                .ok()
                .and_then(|h| h.peel_to_commit().ok())
                .into_iter()
                .collect();
            let refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
            let id = repo
                .commit(Some("HEAD"), &sig, &sig, message, &tree, &refs)
                .unwrap();
            to_oid(id).unwrap()
        }
    }

    #[test]
    fn open_rejects_plain_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Git::open(dir.path()),
            Err(GitError::NotARepo { .. })
        ));
    }

    #[test]
    fn tree_reads() {
        let fx = Fixture::new();
        fx.commit(
            &[
                ("forms/a.json", Some("{\"a\":1}")),
                ("forms/b.json", Some("{}")),
                ("forms/nested/c.json", Some("{}")),
                ("top.txt", Some("top")),
            ],
            "initial",
            1_000,
        );

        let mut names = fx.git.list_tree_dir("forms").unwrap().unwrap();
        names.sort();
        assert_eq!(names, vec!["a.json", "b.json"]);
        assert_eq!(fx.git.list_tree_dir("").unwrap().unwrap(), vec!["top.txt"]);
        assert_eq!(fx.git.list_tree_dir("missing").unwrap(), None);
        assert_eq!(fx.git.list_tree_dir("top.txt").unwrap(), None);

        assert_eq!(
            fx.git.read_head_file("forms/a.json").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(fx.git.read_head_file("forms/zzz.json").unwrap(), None);
        assert_eq!(fx.git.read_head_file("forms").unwrap(), None);
    }

    #[test]
    fn parent_blob_lookup() {
        let fx = Fixture::new();
        fx.commit(&[("a.txt", Some("v1"))], "one", 1_000);
        assert_eq!(fx.git.blob_at_head_parent("a.txt").unwrap(), None);

        fx.commit(&[("a.txt", Some("v2")), ("b.txt", Some("new"))], "two", 2_000);
        assert_eq!(fx.git.blob_at_head("a.txt").unwrap(), Some(b"v2".to_vec()));
        assert_eq!(fx.git.blob_at_head_parent("a.txt").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(fx.git.blob_at_head_parent("b.txt").unwrap(), None);
    }

    #[test]
    fn history_times_track_touching_commits() {
        let fx = Fixture::new();
        fx.commit(&[("a.txt", Some("1"))], "create a", 1_000);
        fx.commit(&[("b.txt", Some("1"))], "create b", 2_000);
        fx.commit(&[("a.txt", Some("2"))], "edit a", 3_000);
        fx.commit(&[("b.txt", Some("2"))], "edit b", 4_000);

        let a = fx.git.path_history_times("a.txt").unwrap().unwrap();
        assert_eq!(a.create.timestamp(), 1_000);
        assert_eq!(a.update.timestamp(), 3_000);

        let b = fx.git.path_history_times("b.txt").unwrap().unwrap();
        assert_eq!(b.create.timestamp(), 2_000);
        assert_eq!(b.update.timestamp(), 4_000);

        assert!(fx.git.path_history_times("never.txt").unwrap().is_none());
    }

    #[test]
    fn worktree_cleanliness_includes_untracked() {
        let fx = Fixture::new();
        fx.commit(&[("a.txt", Some("1"))], "one", 1_000);
        assert!(fx.git.is_worktree_clean().unwrap());

        fx.git.write_worktree_file("dir/new.txt", b"x").unwrap();
        assert!(!fx.git.is_worktree_clean().unwrap());

        fx.git.remove_worktree_file("dir/new.txt").unwrap();
        std::fs::remove_dir(fx.dir.path().join("dir")).unwrap();
        assert!(fx.git.is_worktree_clean().unwrap());

        // Writing identical content keeps the tree clean
        fx.git.write_worktree_file("a.txt", b"1").unwrap();
        assert!(fx.git.is_worktree_clean().unwrap());
    }

    #[test]
    fn amend_replaces_head() {
        let fx = Fixture::new();
        fx.commit(&[("a.txt", Some("1"))], "base", 1_000);
        let before = fx.commit(&[("a.txt", Some("2"))], "tip", 2_000);

        fx.git.write_worktree_file("a.txt", b"3").unwrap();
        fx.git.stage_path("a.txt").unwrap();
        let after = fx
            .git
            .amend_head("tip, amended", &Identity::new("Bot", "bot@example.com"))
            .unwrap();

        assert_ne!(before, after);
        let info = fx.git.head_commit_info().unwrap();
        assert_eq!(info.oid, after);
        assert_eq!(info.summary, "tip, amended");
        assert_eq!(info.parent_count, 1);
        assert_eq!(fx.git.blob_at_head("a.txt").unwrap(), Some(b"3".to_vec()));
        assert_eq!(fx.git.blob_at_head_parent("a.txt").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn tracked_and_removal() {
        let fx = Fixture::new();
        fx.commit(&[("a.txt", Some("1"))], "one", 1_000);
        assert!(fx.git.is_tracked("a.txt").unwrap());
        assert!(!fx.git.is_tracked("b.txt").unwrap());

        fx.git.remove_worktree_file("a.txt").unwrap();
        fx.git.stage_removal("a.txt").unwrap();
        assert!(!fx.git.is_tracked("a.txt").unwrap());
    }

    #[test]
    fn merge_probe_reports_conflicts_without_touching_worktree() {
        let fx = Fixture::new();
        let base = fx.commit(&[("a.txt", Some("base\n"))], "base", 1_000);
        let theirs = fx.commit(&[("a.txt", Some("theirs\n"))], "theirs", 2_000);

        // Move HEAD back to base and create a diverging commit
        fx.git.checkout_detached(&base).unwrap();
        fx.commit(&[("a.txt", Some("ours\n")), ("b.txt", Some("b"))], "ours", 3_000);

        let conflicts = fx.git.merge_conflicts(theirs.as_str()).unwrap();
        assert_eq!(conflicts, vec!["a.txt"]);
        assert!(fx.git.is_worktree_clean().unwrap());
        assert_eq!(fx.git.read_head_file("a.txt").unwrap().as_deref(), Some("ours\n"));

        assert!(fx.git.merge_conflicts(base.as_str()).unwrap().is_empty());
    }

    #[test]
    fn checkout_conflict_on_dirty_tree() {
        let fx = Fixture::new();
        let first = fx.commit(&[("a.txt", Some("1"))], "one", 1_000);
        fx.commit(&[("a.txt", Some("2"))], "two", 2_000);

        fx.git.write_worktree_file("a.txt", b"local edit").unwrap();
        let result = fx.git.checkout_detached(&first);
        assert!(matches!(result, Err(GitError::CheckoutConflict { .. })));
    }

    #[test]
    fn ensure_remote_is_idempotent() {
        let fx = Fixture::new();
        fx.git.ensure_remote(ORIGIN, "file:///tmp/one").unwrap();
        fx.git.ensure_remote(ORIGIN, "file:///tmp/one").unwrap();
        fx.git.ensure_remote(ORIGIN, "file:///tmp/two").unwrap();

        let remote = fx.git.repo.find_remote(ORIGIN).unwrap();
        assert_eq!(remote.url(), Some("file:///tmp/two"));
    }
}
