//! repo::error
//!
//! The closed error taxonomy of repository operations, and the classifier
//! that maps adapter outcomes into it.
//!
//! # Taxonomy
//!
//! | Kind | Meaning | Retried |
//! |---|---|---|
//! | `RepositoryNotFound` | Local working copy absent when required | no |
//! | `InvalidConfiguration` | Malformed remote URL or rejected credentials | no |
//! | `InvariantViolation` | Git reported something a single writer cannot cause | no |
//! | `TransientTransport` | Network-level failure | yes |
//! | `Operational` | Any other unexpected failure | no |
//! | `DomainConflict` | The remote refused the update (e.g. non-fast-forward) | no |
//! | `FileNotFoundForRollback` | Rollback target exists in neither commit | no |
//!
//! Two caller-facing kinds complete the set: `InvalidArgument` for bad
//! paths and `Review` for review service failures.
//!
//! The classifier decides per step: the same git outcome can be an
//! invariant violation during checkout and an ordinary operational failure
//! elsewhere.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::core::ops::retry::Retryable;
use crate::core::paths::PathError;
use crate::core::types::VersionName;
use crate::git::GitError;
use crate::review::ReviewError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Step of a command sequence during which an error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Open,
    Clone,
    Fetch,
    Checkout,
    Reset,
    Write,
    Stage,
    Commit,
    Remote,
    Push,
    Submit,
    Read,
    History,
    Merge,
    Delete,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Step::Open => "open",
            Step::Clone => "clone",
            Step::Fetch => "fetch",
            Step::Checkout => "checkout",
            Step::Reset => "reset",
            Step::Write => "write",
            Step::Stage => "stage",
            Step::Commit => "commit",
            Step::Remote => "remote",
            Step::Push => "push",
            Step::Submit => "submit",
            Step::Read => "read",
            Step::History => "history",
            Step::Merge => "merge",
            Step::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

/// Review service call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOp {
    ChangeInfo,
    FileStatuses,
    Rebase,
    Submit,
}

impl std::fmt::Display for ReviewOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReviewOp::ChangeInfo => "change info",
            ReviewOp::FileStatuses => "file statuses",
            ReviewOp::Rebase => "rebase",
            ReviewOp::Submit => "submit",
        };
        write!(f, "{}", s)
    }
}

/// Stable, message-independent kind of a [`RepoError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidConfiguration,
    InvariantViolation,
    TransientTransport,
    Operational,
    DomainConflict,
    FileNotFoundForRollback,
    InvalidArgument,
    Review,
}

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The working copy for a version does not exist locally.
    #[error("no local repository for version '{version}' at {path}")]
    RepositoryNotFound { version: String, path: PathBuf },

    /// Remote URL or credentials are unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
        #[source]
        source: Option<GitError>,
    },

    /// Git reported a state that cannot occur under single-writer use.
    #[error("invariant violated during {step} of version '{version}': {source}")]
    InvariantViolation {
        version: String,
        step: Step,
        #[source]
        source: GitError,
    },

    /// Network-level failure; retried by the executor.
    #[error("transport failure during {step}: {source}")]
    TransientTransport {
        step: Step,
        #[source]
        source: GitError,
    },

    /// Any other unexpected failure.
    #[error("{message}")]
    Operational {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The remote refused the update; the caller should rebase.
    #[error("conflict: {message}")]
    DomainConflict {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Rollback target exists in neither the last commit nor its parent.
    #[error("nothing to roll back: '{path}' is absent from the last commit and its parent in version '{version}'")]
    FileNotFoundForRollback { version: String, path: String },

    /// Caller passed an unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Review service call failed.
    #[error("review service {operation} failed: {source}")]
    Review {
        operation: ReviewOp,
        #[source]
        source: ReviewError,
    },
}

impl RepoError {
    /// Stable kind for mapping to an outer protocol.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::RepositoryNotFound { .. } => ErrorKind::NotFound,
            RepoError::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
            RepoError::InvariantViolation { .. } => ErrorKind::InvariantViolation,
            RepoError::TransientTransport { .. } => ErrorKind::TransientTransport,
            RepoError::Operational { .. } => ErrorKind::Operational,
            RepoError::DomainConflict { .. } => ErrorKind::DomainConflict,
            RepoError::FileNotFoundForRollback { .. } => ErrorKind::FileNotFoundForRollback,
            RepoError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RepoError::Review { .. } => ErrorKind::Review,
        }
    }

    /// Wrap a review service failure.
    pub fn review(operation: ReviewOp, source: ReviewError) -> Self {
        RepoError::Review { operation, source }
    }
}

impl Retryable for RepoError {
    fn is_transient(&self) -> bool {
        matches!(self, RepoError::TransientTransport { .. })
    }

    fn exhausted(self, attempts: u32, what: &str) -> Self {
        RepoError::Operational {
            message: format!("{} failed after {} attempts", what, attempts),
            source: Some(Box::new(self)),
        }
    }
}

impl From<PathError> for RepoError {
    fn from(err: PathError) -> Self {
        RepoError::InvalidArgument(err.to_string())
    }
}

/// Classify a git outcome produced during `step` on `version`.
///
/// Invariant violations are logged at error level when produced.
pub fn classify(step: Step, version: &VersionName, err: GitError) -> RepoError {
    match err {
        GitError::NotARepo { path } => RepoError::RepositoryNotFound {
            version: version.to_string(),
            path,
        },
        err @ GitError::Transport { .. } => RepoError::TransientTransport { step, source: err },
        err @ (GitError::Auth { .. } | GitError::InvalidRemote { .. }) => {
            RepoError::InvalidConfiguration {
                message: format!("{} of version '{}' rejected by remote", step, version),
                source: Some(err),
            }
        }
        err @ GitError::CheckoutConflict { .. }
            if matches!(step, Step::Checkout | Step::Reset) =>
        {
            invariant(step, version, err)
        }
        err @ GitError::Locked { .. } => invariant(step, version, err),
        err @ GitError::NonFastForward { .. } => RepoError::DomainConflict {
            message: format!("{} of version '{}' is not a fast-forward", step, version),
            source: Some(Box::new(err)),
        },
        err @ GitError::PushRejected { .. } if step == Step::Submit => {
            RepoError::DomainConflict {
                message: format!("submit of version '{}' rejected", version),
                source: Some(Box::new(err)),
            }
        }
        err => RepoError::Operational {
            message: format!("{} of version '{}' failed", step, version),
            source: Some(Box::new(err)),
        },
    }
}

fn invariant(step: Step, version: &VersionName, source: GitError) -> RepoError {
    error!(
        version = %version,
        step = %step,
        error = %source,
        "invariant violation: working copy is not in the state a single writer left it"
    );
    RepoError::InvariantViolation {
        version: version.to_string(),
        step,
        source,
    }
}

/// Classify the outcome of a review action.
///
/// A 409 during rebase means the change is already current and is
/// swallowed; a 409 during submit is a domain conflict.
pub fn classify_review(
    operation: ReviewOp,
    version: &VersionName,
    result: Result<(), ReviewError>,
) -> Result<(), RepoError> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_conflict() && operation == ReviewOp::Rebase => {
            warn!(version = %version, "rebase answered 409, change already current");
            Ok(())
        }
        Err(err) if err.is_conflict() && operation == ReviewOp::Submit => {
            Err(RepoError::DomainConflict {
                message: format!("change '{}' cannot be submitted, rebase it first", version),
                source: Some(Box::new(err)),
            })
        }
        Err(err) => Err(RepoError::review(operation, err)),
    }
}
