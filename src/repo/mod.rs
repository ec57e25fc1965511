//! repo
//!
//! Version materialization: per-version working copies, the command
//! sequences run against them, and the file views built on top.
//!
//! - [`executor`] - Locked, retried git command sequences per version
//! - [`versioned`] - Stable and change file views
//! - [`factory`] - Lazily created, cached views
//! - [`reconcile`] - Tree listing merged with review statuses
//! - [`dates`] - File dates cache
//! - [`error`] - Error taxonomy and classification

pub mod dates;
pub mod error;
pub mod executor;
pub mod factory;
pub mod reconcile;
pub mod versioned;

pub use dates::FileDatesCache;
pub use error::{ErrorKind, RepoError};
pub use executor::{CloneOutcome, CommandExecutor, ExecutorSettings, Publication};
pub use factory::RepositoryFactory;
pub use versioned::{ChangeRepository, StableRepository, VersionedRepository};
