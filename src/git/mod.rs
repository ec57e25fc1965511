//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. Every clone, fetch, checkout,
//! commit and push against a version's working copy flows through this
//! interface. No other module imports `git2`, and nothing shells out to the
//! git CLI.
//!
//! # Responsibilities
//!
//! - Opening and cloning working copies
//! - Fetch and push over an authenticated transport
//! - Detached checkout and hard reset
//! - Index staging, commit and amend
//! - Tree reads, path history and in-memory merge probes
//! - Translating `git2` failures into [`GitError`] outcomes
//!
//! # Invariants
//!
//! - No other module calls git2 directly
//! - All operations return strong types (Oid, FileDates) or outcomes
//! - A single remote named [`ORIGIN`] is used everywhere

mod interface;

pub use interface::{CommitInfo, Credentials, Git, GitError, Identity, ORIGIN};
