//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`VersionName`] - Key of a version: the stable branch or a change number
//! - [`BranchName`] - Validated Git branch name
//! - [`RefName`] - Validated Git reference name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`ChangeId`] - Review service Change-Id trailer value
//! - [`FileStatus`], [`FileEntry`], [`FileDates`] - Listing results
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use registry_vcs::core::types::{RefName, VersionName};
//!
//! let version = VersionName::new("42").unwrap();
//! let refname = RefName::new("refs/changes/42/42/3").unwrap();
//! assert_eq!(version.as_str(), "42");
//! assert_eq!(refname.as_str(), "refs/changes/42/42/3");
//!
//! // Version names map to a single directory, so separators are rejected
//! assert!(VersionName::new("../etc").is_err());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid version name: {0}")]
    InvalidVersionName(String),

    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid change id: {0}")]
    InvalidChangeId(String),
}

/// Characters git refuses anywhere in a refname.
const FORBIDDEN_REF_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// Check a name against `git check-ref-format` rules.
///
/// Returns a description of the first violated rule.
fn check_ref_format(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("cannot be empty".into());
    }
    if name == "@" {
        return Err("cannot be '@'".into());
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err("cannot start or end with '/'".into());
    }
    for pattern in ["..", "@{", "//"] {
        if name.contains(pattern) {
            return Err(format!("cannot contain '{pattern}'"));
        }
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_REF_CHARS.contains(c)) {
        return Err(format!("cannot contain '{c}'"));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err("cannot contain control characters".into());
    }
    for component in name.split('/') {
        if component.starts_with('.') {
            return Err("path component cannot start with '.'".into());
        }
        if component.ends_with(".lock") {
            return Err("path component cannot end with '.lock'".into());
        }
    }
    Ok(())
}

/// Name of a version: either the stable branch or a numeric change id.
///
/// A version name maps to exactly one directory under the repository root,
/// so it must be a single path component.
///
/// # Example
///
/// ```
/// use registry_vcs::core::types::VersionName;
///
/// assert!(VersionName::new("master").is_ok());
/// assert!(VersionName::new("1024").is_ok());
///
/// assert!(VersionName::new("").is_err());
/// assert!(VersionName::new("a/b").is_err());
/// assert!(VersionName::new("..").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionName(String);

impl VersionName {
    /// Create a new validated version name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidVersionName` if the name is not a safe
    /// single directory name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidVersionName(
                "version name cannot be empty".into(),
            ));
        }
        if name.starts_with('.') {
            return Err(TypeError::InvalidVersionName(format!(
                "'{name}' cannot start with '.'"
            )));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(TypeError::InvalidVersionName(format!(
                "'{name}' must be a single path component"
            )));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypeError::InvalidVersionName(format!(
                "'{name}' cannot contain whitespace or control characters"
            )));
        }
        Ok(())
    }

    /// Get the version name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VersionName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<VersionName> for String {
    fn from(name: VersionName) -> Self {
        name.0
    }
}

impl AsRef<str> for VersionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git branch name.
///
/// # Example
///
/// ```
/// use registry_vcs::core::types::BranchName;
///
/// let name = BranchName::new("master").unwrap();
/// assert_eq!(name.remote_tracking_ref("origin"), "refs/remotes/origin/master");
/// assert!(BranchName::new("bad..name").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        check_ref_format(&name)
            .map_err(|rule| TypeError::InvalidBranchName(format!("'{name}' {rule}")))?;
        Ok(Self(name))
    }

    /// Full ref of the local branch (`refs/heads/<name>`).
    pub fn local_ref(&self) -> String {
        format!("refs/heads/{}", self.0)
    }

    /// Full ref of the remote-tracking branch (`refs/remotes/<remote>/<name>`).
    pub fn remote_tracking_ref(&self, remote: &str) -> String {
        format!("refs/remotes/{}/{}", remote, self.0)
    }

    /// Review-ref that opens (or updates) a change targeting this branch.
    pub fn review_ref(&self) -> String {
        format!("refs/for/{}", self.0)
    }

    /// Review-ref that uploads a private change and submits it immediately.
    pub fn submit_ref(&self) -> String {
        format!("refs/for/{}%private,submit", self.0)
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git reference name.
///
/// Review services publish one ref per change revision, e.g.
/// `refs/changes/42/1042/3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_ref_format(&name)
            .map_err(|rule| TypeError::InvalidRefName(format!("'{name}' {rule}")))?;
        Ok(Self(name))
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256), normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a 40 or 64
    /// character hex string.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// ```
    /// use registry_vcs::core::types::Oid;
    ///
    /// let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
    /// assert_eq!(oid.short(7), "abc123d");
    /// ```
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value of the `Change-Id:` commit trailer that ties commits to a review change.
///
/// # Example
///
/// ```
/// use registry_vcs::core::types::ChangeId;
///
/// let id = ChangeId::generate(&["parent", "forms/a.json", "2024-01-01T00:00:00Z"]);
/// assert!(id.as_str().starts_with('I'));
/// assert_eq!(id.as_str().len(), 41);
///
/// let message = id.apply_to("Update form");
/// assert_eq!(message, format!("Update form\n\nChange-Id: {}", id));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChangeId(String);

impl ChangeId {
    /// Trailer key recognized by the review service.
    pub const TRAILER: &'static str = "Change-Id:";

    /// Wrap an id handed out by the review service.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidChangeId` if the id is empty or contains whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidChangeId(format!(
                "'{id}' must be a non-empty token"
            )));
        }
        Ok(Self(id))
    }

    /// Derive a fresh id (`I` + 40 hex chars) from the given seed parts.
    pub fn generate(parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update(b"\0");
        }
        let digest = hex::encode(hasher.finalize());
        Self(format!("I{}", &digest[..40]))
    }

    /// Append this id as a trailer unless `message` already carries one.
    pub fn apply_to(&self, message: &str) -> String {
        let has_trailer = message
            .lines()
            .any(|line| line.trim_start().starts_with(Self::TRAILER));
        if has_trailer {
            message.to_string()
        } else {
            format!("{}\n\n{} {}", message.trim_end(), Self::TRAILER, self.0)
        }
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChangeId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ChangeId> for String {
    fn from(id: ChangeId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ChangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a file inside a version, relative to the stable branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    /// Unchanged relative to the stable branch.
    Current,
    /// Added by the change.
    New,
    /// Modified or renamed by the change.
    Changed,
    /// Removed by the change.
    Deleted,
}

impl FileStatus {
    /// Map a review service per-file status code.
    ///
    /// An absent code means "modified". Codes outside the known set
    /// (copied, rewritten, ...) have no mapping and yield `None`.
    ///
    /// ```
    /// use registry_vcs::core::types::FileStatus;
    ///
    /// assert_eq!(FileStatus::from_diff_code(None), Some(FileStatus::Changed));
    /// assert_eq!(FileStatus::from_diff_code(Some('A')), Some(FileStatus::New));
    /// assert_eq!(FileStatus::from_diff_code(Some('C')), None);
    /// ```
    pub fn from_diff_code(code: Option<char>) -> Option<Self> {
        match code {
            None | Some('R') | Some('M') => Some(FileStatus::Changed),
            Some('A') => Some(FileStatus::New),
            Some('D') => Some(FileStatus::Deleted),
            Some(_) => None,
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileStatus::Current => "current",
            FileStatus::New => "new",
            FileStatus::Changed => "changed",
            FileStatus::Deleted => "deleted",
        };
        write!(f, "{}", s)
    }
}

/// First and last commit time of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDates {
    /// Time of the oldest commit touching the path.
    pub create: DateTime<Utc>,
    /// Time of the newest commit touching the path.
    pub update: DateTime<Utc>,
}

/// A file as seen through a versioned repository listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Base file name.
    pub name: String,
    /// Path relative to the repository root.
    pub path: String,
    /// Reconciled status; `None` when the review service reported a code
    /// with no mapping.
    pub status: Option<FileStatus>,
    /// Time of the first commit touching the file, if known.
    pub created: Option<DateTime<Utc>>,
    /// Time of the last commit touching the file, if known.
    pub updated: Option<DateTime<Utc>>,
}

impl FileEntry {
    /// Entry for a file present in the local tree.
    pub fn current(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            status: Some(FileStatus::Current),
            created: None,
            updated: None,
        }
    }

    /// Attach commit dates to this entry.
    pub fn with_dates(mut self, dates: Option<FileDates>) -> Self {
        self.created = dates.map(|d| d.create);
        self.updated = dates.map(|d| d.update);
        self
    }

    /// Whether this entry still exists in its version.
    pub fn is_present(&self) -> bool {
        self.status != Some(FileStatus::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod version_name {
        use super::*;

        #[test]
        fn valid_names() {
            assert!(VersionName::new("master").is_ok());
            assert!(VersionName::new("42").is_ok());
            assert!(VersionName::new("release-1.2").is_ok());
        }

        #[test]
        fn rejects_separators_and_dots() {
            assert!(VersionName::new("").is_err());
            assert!(VersionName::new(".").is_err());
            assert!(VersionName::new("..").is_err());
            assert!(VersionName::new(".git").is_err());
            assert!(VersionName::new("a/b").is_err());
            assert!(VersionName::new("a\\b").is_err());
            assert!(VersionName::new("has space").is_err());
        }

        #[test]
        fn serde_roundtrip() {
            let name = VersionName::new("42").unwrap();
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, "\"42\"");
            let parsed: VersionName = serde_json::from_str(&json).unwrap();
            assert_eq!(name, parsed);
        }

        #[test]
        fn serde_rejects_invalid() {
            let parsed: Result<VersionName, _> = serde_json::from_str("\"a/b\"");
            assert!(parsed.is_err());
        }
    }

    mod branch_name {
        use super::*;

        #[test]
        fn refs_derived_from_branch() {
            let branch = BranchName::new("master").unwrap();
            assert_eq!(branch.local_ref(), "refs/heads/master");
            assert_eq!(branch.remote_tracking_ref("origin"), "refs/remotes/origin/master");
            assert_eq!(branch.review_ref(), "refs/for/master");
            assert_eq!(branch.submit_ref(), "refs/for/master%private,submit");
        }

        #[test]
        fn invalid_branch_names() {
            assert!(BranchName::new("").is_err());
            assert!(BranchName::new("-flag").is_err());
            assert!(BranchName::new("a..b").is_err());
            assert!(BranchName::new("x.lock").is_err());
            assert!(BranchName::new("has space").is_err());
        }
    }

    mod ref_name {
        use super::*;

        #[test]
        fn invalid_refs() {
            assert!(RefName::new("").is_err());
            assert!(RefName::new("/refs/heads/x").is_err());
            assert!(RefName::new("refs/heads/x/").is_err());
            assert!(RefName::new("refs//heads").is_err());
            assert!(RefName::new("refs/heads/a:b").is_err());
            assert!(RefName::new("refs/heads/.hidden").is_err());
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn normalizes_case() {
            let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
            assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
        }

        #[test]
        fn rejects_bad_length_and_chars() {
            assert!(Oid::new("abc").is_err());
            assert!(Oid::new("g".repeat(40)).is_err());
        }
    }

    mod change_id {
        use super::*;

        #[test]
        fn generate_is_deterministic() {
            let a = ChangeId::generate(&["x", "y"]);
            let b = ChangeId::generate(&["x", "y"]);
            let c = ChangeId::generate(&["xy"]);
            assert_eq!(a, b);
            assert_ne!(a, c);
        }

        #[test]
        fn trailer_appended_once() {
            let id = ChangeId::new("I0123").unwrap();
            let message = id.apply_to("Edit form\n");
            assert_eq!(message, "Edit form\n\nChange-Id: I0123");
            assert_eq!(id.apply_to(&message), message);
        }

        #[test]
        fn rejects_blank() {
            assert!(ChangeId::new("").is_err());
            assert!(ChangeId::new("I 1").is_err());
        }
    }

    mod file_status {
        use super::*;

        #[test]
        fn diff_code_mapping() {
            assert_eq!(FileStatus::from_diff_code(None), Some(FileStatus::Changed));
            assert_eq!(FileStatus::from_diff_code(Some('R')), Some(FileStatus::Changed));
            assert_eq!(FileStatus::from_diff_code(Some('M')), Some(FileStatus::Changed));
            assert_eq!(FileStatus::from_diff_code(Some('A')), Some(FileStatus::New));
            assert_eq!(FileStatus::from_diff_code(Some('D')), Some(FileStatus::Deleted));
            assert_eq!(FileStatus::from_diff_code(Some('C')), None);
            assert_eq!(FileStatus::from_diff_code(Some('W')), None);
        }

        #[test]
        fn serializes_upper_case() {
            let json = serde_json::to_string(&FileStatus::Deleted).unwrap();
            assert_eq!(json, "\"DELETED\"");
        }
    }

    mod file_entry {
        use super::*;

        #[test]
        fn presence_follows_status() {
            let mut entry = FileEntry::current("a.json", "forms/a.json");
            assert!(entry.is_present());
            entry.status = Some(FileStatus::Deleted);
            assert!(!entry.is_present());
            entry.status = None;
            assert!(entry.is_present());
        }
    }
}
