//! review::traits
//!
//! Trait definition for the remote review service.
//!
//! # Design
//!
//! The review service is an external collaborator consumed as a black box.
//! This layer only reads change metadata (current ref, subject, Change-Id)
//! and the per-file status map, and forwards rebase/submit requests. The
//! trait is synchronous because every caller already runs on its own
//! blocking thread.
//!
//! # Example
//!
//! ```ignore
//! use registry_vcs::review::ReviewService;
//!
//! fn describe(review: &dyn ReviewService, version: &VersionName) -> Result<(), ReviewError> {
//!     let change = review.change_info(version)?;
//!     println!("change {} at {}: {}", change.number, change.current_ref, change.subject);
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::types::{ChangeId, RefName, VersionName};

/// HTTP status the review service answers when a change is already in the
/// requested state (rebase) or cannot be merged (submit).
pub const CONFLICT_STATUS: u16 = 409;

/// Errors from review service operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReviewError {
    /// Authentication failed (invalid credentials, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested change was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ReviewError {
    /// Whether this is a 409-class response.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReviewError::ApiError { status, .. } if *status == CONFLICT_STATUS)
    }
}

/// Metadata of an open review change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeInfo {
    /// Change number (equals the version name)
    pub number: u64,
    /// Change-Id trailer value
    pub change_id: ChangeId,
    /// Ref of the current revision, e.g. `refs/changes/42/42/3`
    pub current_ref: RefName,
    /// Subject of the current revision
    pub subject: String,
}

/// Whole-change file status map: repository path to status code.
///
/// `None` means the service reported no code (a plain modification).
pub type FileDiffMap = BTreeMap<String, Option<char>>;

/// Remote review service.
pub trait ReviewService: Send + Sync {
    /// Get the service name (e.g. "gerrit", "mock").
    fn name(&self) -> &'static str;

    /// Fetch the current metadata of the change behind `version`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no such change exists
    fn change_info(&self, version: &VersionName) -> Result<ChangeInfo, ReviewError>;

    /// Fetch the per-file status map of the change's current revision.
    fn file_statuses(&self, version: &VersionName) -> Result<FileDiffMap, ReviewError>;

    /// Rebase the change onto the tip of its target branch.
    ///
    /// Answers 409 when the change is already up to date.
    fn rebase(&self, version: &VersionName) -> Result<(), ReviewError>;

    /// Submit (merge) the change.
    ///
    /// Answers 409 when the change cannot be merged as is.
    fn submit(&self, version: &VersionName) -> Result<(), ReviewError>;
}
