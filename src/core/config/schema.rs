//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Location
//!
//! Searched in order (first existing file wins):
//! 1. `$REGVCS_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/regvcs/config.toml`
//! 3. `~/.regvcs/config.toml`
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., the stable branch must be a valid branch name,
//! the base URL must use a scheme git can speak).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{BranchName, VersionName};

/// URL schemes the git transport layer understands.
pub const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "ssh", "git", "file"];

/// Top-level configuration.
///
/// # Example
///
/// ```toml
/// root = "/var/lib/regvcs/repositories"
/// stable_branch = "master"
///
/// [remote]
/// base_url = "https://review.example.com"
/// repository = "registry-regulations"
/// username = "admin"
/// password = "secret"
///
/// [retry]
/// max_attempts = 3
///
/// [author]
/// name = "Registry Admin"
/// email = "admin@registry.local"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Directory holding one working copy per version name
    pub root: Option<PathBuf>,

    /// Version name (and branch) of the stable published configuration
    pub stable_branch: Option<String>,

    /// Remote review host
    pub remote: Option<RemoteConfig>,

    /// Retry settings for transport steps
    pub retry: Option<RetryConfig>,

    /// Identity used for commits created by this layer
    pub author: Option<AuthorConfig>,
}

impl RegistryConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.stable_branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid stable branch: {}", e))
            })?;
            // The stable branch is also the directory name of its working copy
            VersionName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid stable branch: {}", e))
            })?;
        }

        if let Some(root) = &self.root {
            if root.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue("root cannot be empty".into()));
            }
        }

        if let Some(remote) = &self.remote {
            remote.validate()?;
        }
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        if let Some(author) = &self.author {
            author.validate()?;
        }

        Ok(())
    }
}

/// Remote review host settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// Base URL; the clone URL is `<base_url>/<repository>`
    pub base_url: Option<String>,

    /// Repository name on the host
    pub repository: Option<String>,

    /// Username for plaintext credentials
    pub username: Option<String>,

    /// Password for plaintext credentials
    pub password: Option<String>,
}

impl RemoteConfig {
    /// Validate the remote settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base) = &self.base_url {
            let parsed = url::Url::parse(base).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid remote base_url '{}': {}", base, e))
            })?;
            if !SUPPORTED_SCHEMES.contains(&parsed.scheme()) {
                return Err(ConfigError::InvalidValue(format!(
                    "unsupported remote scheme '{}', must be one of: {}",
                    parsed.scheme(),
                    SUPPORTED_SCHEMES.join(", ")
                )));
            }
        }

        if let Some(repo) = &self.repository {
            let trimmed = repo.trim_matches('/');
            if trimmed.is_empty() || trimmed.split('/').any(|c| c == ".." || c.is_empty()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid remote repository name '{}'",
                    repo
                )));
            }
        }

        if self.username.is_some() != self.password.is_some() {
            return Err(ConfigError::InvalidValue(
                "remote username and password must be set together".into(),
            ));
        }

        Ok(())
    }
}

/// Retry settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts for a transport step (at least 1)
    pub max_attempts: Option<u32>,
}

impl RetryConfig {
    /// Validate the retry settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == Some(0) {
            return Err(ConfigError::InvalidValue(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Commit identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorConfig {
    /// Display name
    pub name: Option<String>,

    /// Email address
    pub email: Option<String>,
}

impl AuthorConfig {
    /// Validate the author identity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err(ConfigError::InvalidValue("author.name cannot be empty".into()));
        }
        if matches!(&self.email, Some(e) if !e.contains('@')) {
            return Err(ConfigError::InvalidValue(
                "author.email must be an email address".into(),
            ));
        }
        Ok(())
    }
}
