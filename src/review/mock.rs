//! review::mock
//!
//! Mock review service for deterministic testing.
//!
//! # Design
//!
//! The mock stores changes in memory, records every call, and can be told
//! to fail a specific operation with a given error.
//!
//! # Example
//!
//! ```
//! use registry_vcs::core::types::{ChangeId, RefName, VersionName};
//! use registry_vcs::review::mock::MockReviewService;
//! use registry_vcs::review::{ChangeInfo, ReviewService};
//!
//! let review = MockReviewService::new().with_change(
//!     ChangeInfo {
//!         number: 42,
//!         change_id: ChangeId::new("I42").unwrap(),
//!         current_ref: RefName::new("refs/changes/42/42/1").unwrap(),
//!         subject: "Edit forms".to_string(),
//!     },
//!     [("forms/a.json".to_string(), Some('A'))],
//! );
//!
//! let version = VersionName::new("42").unwrap();
//! let info = review.change_info(&version).unwrap();
//! assert_eq!(info.subject, "Edit forms");
//! assert_eq!(review.file_statuses(&version).unwrap().len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{ChangeInfo, FileDiffMap, ReviewError, ReviewService};
use crate::core::types::VersionName;

/// Mock review service for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockReviewService {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockReviewInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockReviewInner {
    /// Changes by version name.
    changes: HashMap<String, MockChange>,
    /// Operation to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

#[derive(Debug, Clone)]
struct MockChange {
    info: ChangeInfo,
    files: FileDiffMap,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail change_info with the given error.
    ChangeInfo(ReviewError),
    /// Fail file_statuses with the given error.
    FileStatuses(ReviewError),
    /// Fail rebase with the given error.
    Rebase(ReviewError),
    /// Fail submit with the given error.
    Submit(ReviewError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ChangeInfo { version: String },
    FileStatuses { version: String },
    Rebase { version: String },
    Submit { version: String },
}

impl MockReviewService {
    /// Create a new mock with no changes.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockReviewInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Register a change, keyed by its number.
    pub fn with_change(
        self,
        info: ChangeInfo,
        files: impl IntoIterator<Item = (String, Option<char>)>,
    ) -> Self {
        {
            let mut inner = self.state();
            let files = files.into_iter().collect();
            inner
                .changes
                .insert(info.number.to_string(), MockChange { info, files });
        }
        self
    }

    /// Replace the file status map of an existing change.
    pub fn set_files(&self, version: &str, files: FileDiffMap) {
        if let Some(change) = self.state().changes.get_mut(version) {
            change.files = files;
        }
    }

    /// Configure an operation to fail.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.state().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    fn record(&self, op: MockOperation) {
        self.state().operations.push(op);
    }

    fn check_fail(&self, expected: &str) -> Result<(), ReviewError> {
        let inner = self.state();
        let err = match &inner.fail_on {
            Some(FailOn::ChangeInfo(e)) if expected == "change_info" => e,
            Some(FailOn::FileStatuses(e)) if expected == "file_statuses" => e,
            Some(FailOn::Rebase(e)) if expected == "rebase" => e,
            Some(FailOn::Submit(e)) if expected == "submit" => e,
            _ => return Ok(()),
        };
        Err(err.clone())
    }

    fn change(&self, version: &VersionName) -> Result<MockChange, ReviewError> {
        self.state()
            .changes
            .get(version.as_str())
            .cloned()
            .ok_or_else(|| ReviewError::NotFound(format!("change {}", version)))
    }
}

impl ReviewService for MockReviewService {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn change_info(&self, version: &VersionName) -> Result<ChangeInfo, ReviewError> {
        self.record(MockOperation::ChangeInfo {
            version: version.to_string(),
        });
        self.check_fail("change_info")?;
        Ok(self.change(version)?.info)
    }

    fn file_statuses(&self, version: &VersionName) -> Result<FileDiffMap, ReviewError> {
        self.record(MockOperation::FileStatuses {
            version: version.to_string(),
        });
        self.check_fail("file_statuses")?;
        Ok(self.change(version)?.files)
    }

    fn rebase(&self, version: &VersionName) -> Result<(), ReviewError> {
        self.record(MockOperation::Rebase {
            version: version.to_string(),
        });
        self.check_fail("rebase")?;
        self.change(version).map(|_| ())
    }

    fn submit(&self, version: &VersionName) -> Result<(), ReviewError> {
        self.record(MockOperation::Submit {
            version: version.to_string(),
        });
        self.check_fail("submit")?;
        self.change(version).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ChangeId, RefName};

    fn change(number: u64) -> ChangeInfo {
        ChangeInfo {
            number,
            change_id: ChangeId::new(format!("I{number}")).unwrap(),
            current_ref: RefName::new(format!("refs/changes/{number}/{number}/1")).unwrap(),
            subject: format!("change {number}"),
        }
    }

    fn version(name: &str) -> VersionName {
        VersionName::new(name).unwrap()
    }

    #[test]
    fn returns_registered_change() {
        let review = MockReviewService::new().with_change(change(7), []);
        let info = review.change_info(&version("7")).unwrap();
        assert_eq!(info, change(7));
        assert!(review.file_statuses(&version("7")).unwrap().is_empty());
    }

    #[test]
    fn unknown_change_not_found() {
        let review = MockReviewService::new();
        assert!(matches!(
            review.change_info(&version("9")),
            Err(ReviewError::NotFound(_))
        ));
    }

    #[test]
    fn set_files_replaces_map() {
        let review = MockReviewService::new().with_change(change(1), []);
        let mut files = FileDiffMap::new();
        files.insert("a".into(), Some('D'));
        review.set_files("1", files.clone());
        assert_eq!(review.file_statuses(&version("1")).unwrap(), files);
    }

    #[test]
    fn fail_on_targets_one_operation() {
        let conflict = ReviewError::ApiError {
            status: 409,
            message: "up to date".into(),
        };
        let review = MockReviewService::new()
            .with_change(change(3), [])
            .fail_on(FailOn::Rebase(conflict.clone()));

        assert_eq!(review.rebase(&version("3")), Err(conflict));
        assert!(review.submit(&version("3")).is_ok());

        review.clear_fail_on();
        assert!(review.rebase(&version("3")).is_ok());
    }

    #[test]
    fn operations_recorded() {
        let review = MockReviewService::new().with_change(change(5), []);
        let v = version("5");
        review.change_info(&v).unwrap();
        review.submit(&v).unwrap();

        assert_eq!(
            review.operations(),
            vec![
                MockOperation::ChangeInfo {
                    version: "5".into()
                },
                MockOperation::Submit {
                    version: "5".into()
                },
            ]
        );
    }

    #[test]
    fn clones_share_state() {
        let review = MockReviewService::new();
        let clone = review.clone().with_change(change(2), []);
        assert!(review.change_info(&version("2")).is_ok());
        assert_eq!(clone.name(), "mock");
    }
}
