//! repo::dates
//!
//! Process-lifetime memo of first/last commit times per (version, path).
//!
//! Entries are never invalidated by amending the path, even though an amend
//! rewrites the history the dates were computed from. Only removing a whole
//! version drops its entries.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::core::types::FileDates;

/// Cache of file dates keyed by `(version, path)`.
#[derive(Debug, Default)]
pub struct FileDatesCache {
    entries: Mutex<HashMap<(String, String), FileDates>>,
}

impl FileDatesCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<(String, String), FileDates>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Cached dates for `path` in `version`.
    pub fn get(&self, version: &str, path: &str) -> Option<FileDates> {
        self.map()
            .get(&(version.to_string(), path.to_string()))
            .copied()
    }

    /// Remember dates for `path` in `version`.
    pub fn insert(&self, version: &str, path: &str, dates: FileDates) {
        self.map()
            .insert((version.to_string(), path.to_string()), dates);
    }

    /// Drop every entry of `version`. Returns how many were removed.
    pub fn evict_version(&self, version: &str) -> usize {
        let mut map = self.map();
        let before = map.len();
        map.retain(|(v, _), _| v != version);
        before - map.len()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn dates(create: i64, update: i64) -> FileDates {
        FileDates {
            create: Utc.timestamp_opt(create, 0).unwrap(),
            update: Utc.timestamp_opt(update, 0).unwrap(),
        }
    }

    #[test]
    fn insert_then_get() {
        let cache = FileDatesCache::new();
        assert!(cache.get("42", "forms/a.json").is_none());

        cache.insert("42", "forms/a.json", dates(1, 2));
        assert_eq!(cache.get("42", "forms/a.json"), Some(dates(1, 2)));
        assert!(cache.get("43", "forms/a.json").is_none());
    }

    #[test]
    fn keys_are_per_version_and_path() {
        let cache = FileDatesCache::new();
        cache.insert("42", "a", dates(1, 1));
        cache.insert("42", "b", dates(2, 2));
        cache.insert("master", "a", dates(3, 3));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn evict_version_keeps_others() {
        let cache = FileDatesCache::new();
        cache.insert("42", "a", dates(1, 1));
        cache.insert("42", "b", dates(2, 2));
        cache.insert("master", "a", dates(3, 3));

        assert_eq!(cache.evict_version("42"), 2);
        assert!(cache.get("42", "a").is_none());
        assert_eq!(cache.get("master", "a"), Some(dates(3, 3)));
        assert_eq!(cache.evict_version("42"), 0);
    }
}
