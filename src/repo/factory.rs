//! repo::factory
//!
//! Lazily created, cached repository views per version name.
//!
//! `get` builds the right variant for a name (the stable branch name gets
//! the stable view, anything else a change view), pulls it once, and keeps
//! it for the life of the factory. Concurrent first requests for the same
//! name may both pull; the first inserted instance wins and is returned to
//! both callers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use super::error::RepoError;
use super::executor::CommandExecutor;
use super::versioned::{ChangeRepository, StableRepository, VersionedRepository};
use crate::core::types::VersionName;
use crate::review::ReviewService;

type Cache = HashMap<String, Arc<VersionedRepository>>;

/// Factory and cache of [`VersionedRepository`] instances.
pub struct RepositoryFactory {
    executor: Arc<CommandExecutor>,
    review: Arc<dyn ReviewService>,
    cache: Mutex<Cache>,
}

impl std::fmt::Debug for RepositoryFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryFactory")
            .field("review", &self.review.name())
            .field("cached", &self.cached_versions())
            .finish()
    }
}

impl RepositoryFactory {
    pub fn new(executor: Arc<CommandExecutor>, review: Arc<dyn ReviewService>) -> Self {
        Self {
            executor,
            review,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// The shared executor.
    pub fn executor(&self) -> &Arc<CommandExecutor> {
        &self.executor
    }

    /// Build a view for `version` without pulling or caching it.
    pub fn create(&self, version: VersionName) -> VersionedRepository {
        if version.as_str() == self.executor.stable_branch().as_str() {
            VersionedRepository::Stable(StableRepository::new(self.executor.clone(), version))
        } else {
            VersionedRepository::Change(ChangeRepository::new(
                self.executor.clone(),
                self.review.clone(),
                version,
            ))
        }
    }

    /// The cached view for `version`, created and pulled on first use.
    pub fn get(&self, version: &VersionName) -> Result<Arc<VersionedRepository>, RepoError> {
        if let Some(repo) = self.cache().get(version.as_str()) {
            return Ok(repo.clone());
        }

        // Pull outside the cache lock; the executor serializes per version.
        let repo = self.create(version.clone());
        repo.pull_latest()?;
        debug!(version = %version, stable = repo.is_stable(), "created repository view");

        let mut cache = self.cache();
        let entry = cache
            .entry(version.as_str().to_string())
            .or_insert_with(|| Arc::new(repo));
        Ok(entry.clone())
    }

    /// Pull a cached view again. Returns `false` if `version` is not cached.
    pub fn refresh(&self, version: &VersionName) -> Result<bool, RepoError> {
        let repo = self.cache().get(version.as_str()).cloned();
        match repo {
            Some(repo) => {
                repo.pull_latest()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Forget the view and remove its working copy.
    pub fn close(&self, version: &VersionName) -> Result<(), RepoError> {
        let evicted = self.cache().remove(version.as_str()).is_some();
        self.executor.delete_repo(version)?;
        info!(version = %version, evicted, "closed repository");
        Ok(())
    }

    /// Names of cached versions, sorted.
    pub fn cached_versions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cache().keys().cloned().collect();
        names.sort();
        names
    }
}
