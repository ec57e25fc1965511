//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! An explicit path (from `--config`) is used as-is and must exist.
//! Otherwise the first existing file of:
//! 1. `$REGVCS_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/regvcs/config.toml`
//! 3. `~/.regvcs/config.toml`
//!
//! A missing file is not an error; defaults are used.
//!
//! # Example
//!
//! ```no_run
//! use registry_vcs::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("Root: {}", config.root().display());
//! println!("Stable branch: {}", config.stable_branch());
//! if let Some(url) = config.remote_url() {
//!     println!("Remote: {}", url);
//! }
//! ```

pub mod schema;

pub use schema::{AuthorConfig, RegistryConfig, RemoteConfig, RetryConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::ops::retry::DEFAULT_MAX_ATTEMPTS;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "REGVCS_CONFIG";

/// Default repository root, relative to the working directory.
pub const DEFAULT_ROOT: &str = "repositories";

/// Default stable branch name.
pub const DEFAULT_STABLE_BRANCH: &str = "master";

/// Default commit author name.
pub const DEFAULT_AUTHOR_NAME: &str = "Registry Admin";

/// Default commit author email.
pub const DEFAULT_AUTHOR_EMAIL: &str = "admin@registry.local";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub file: RegistryConfig,
    /// Path the configuration was loaded from (if any)
    path: Option<PathBuf>,
}

impl Config {
    /// Wrap an already-parsed configuration after validating it.
    pub fn from_parsed(file: RegistryConfig) -> Result<Self, ConfigError> {
        file.validate()?;
        Ok(Self { file, path: None })
    }

    /// Load configuration from `explicit`, or from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing, or if a found file
    /// cannot be parsed or fails validation.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::candidate_paths(|key| std::env::var(key).ok(), dirs::home_dir())
                .into_iter()
                .find(|p| p.exists()),
        };

        let Some(path) = path else {
            tracing::debug!("no config file found, using defaults");
            return Ok(Self::default());
        };

        let file = Self::read_config(&path)?;
        file.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Self {
            file,
            path: Some(path),
        })
    }

    /// Candidate config locations, in search order.
    fn candidate_paths(
        env: impl Fn(&str) -> Option<String>,
        home: Option<PathBuf>,
    ) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(explicit) = env(CONFIG_ENV) {
            paths.push(PathBuf::from(explicit));
        }
        if let Some(xdg_home) = env("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("regvcs/config.toml"));
        }
        if let Some(home) = home {
            paths.push(home.join(".regvcs/config.toml"));
        }
        paths
    }

    /// Read and parse a config file.
    fn read_config(path: &Path) -> Result<RegistryConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Directory holding the per-version working copies.
    ///
    /// Defaults to `./repositories`.
    pub fn root(&self) -> PathBuf {
        self.file
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT))
    }

    /// Name of the stable branch.
    ///
    /// Defaults to "master".
    pub fn stable_branch(&self) -> &str {
        self.file
            .stable_branch
            .as_deref()
            .unwrap_or(DEFAULT_STABLE_BRANCH)
    }

    /// Clone URL composed as `<base_url>/<repository>`.
    ///
    /// Returns `None` unless both parts are configured.
    pub fn remote_url(&self) -> Option<String> {
        let remote = self.file.remote.as_ref()?;
        let base = remote.base_url.as_deref()?;
        let repo = remote.repository.as_deref()?;
        Some(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            repo.trim_matches('/')
        ))
    }

    /// Plaintext credentials as `(username, password)`, if configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let remote = self.file.remote.as_ref()?;
        Some((remote.username.as_deref()?, remote.password.as_deref()?))
    }

    /// Total attempts for transport steps.
    ///
    /// Defaults to 3.
    pub fn max_attempts(&self) -> u32 {
        self.file
            .retry
            .as_ref()
            .and_then(|r| r.max_attempts)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    /// Commit author name.
    pub fn author_name(&self) -> &str {
        self.file
            .author
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .unwrap_or(DEFAULT_AUTHOR_NAME)
    }

    /// Commit author email.
    pub fn author_email(&self) -> &str {
        self.file
            .author
            .as_ref()
            .and_then(|a| a.email.as_deref())
            .unwrap_or(DEFAULT_AUTHOR_EMAIL)
    }

    /// Override the repository root (e.g. from `--root`).
    pub fn set_root(&mut self, root: PathBuf) {
        self.file.root = Some(root);
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
