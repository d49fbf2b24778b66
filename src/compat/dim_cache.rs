//! Dimension Compatibility Cache: short-TTL memoization of validation outcomes per
//! (provider, model).

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// A cached validation outcome for one (provider, model) pair.
#[derive(Debug, Clone)]
pub struct DimCacheEntry {
    /// Discovered dimension, if validation succeeded.
    pub dimension: Option<u64>,
    /// Whether the last validation considered this pair valid.
    pub valid: bool,
    /// When this entry was last (re)validated.
    pub last_validated: DateTime<Utc>,
    /// The last error message encountered, if any.
    pub last_error: Option<String>,
}

/// TTL-bounded memoization of (provider, model) validation outcomes.
pub struct DimensionCompatibilityCache {
    ttl: ChronoDuration,
    entries: RwLock<HashMap<(String, String), DimCacheEntry>>,
}

impl DimensionCompatibilityCache {
    /// Creates a cache with the given TTL.
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            ttl: ChronoDuration::hours(ttl_hours.max(1)),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a fresh (non-stale) entry for `(provider, model)`, if one exists.
    pub fn get(&self, provider: &str, model: &str) -> Option<DimCacheEntry> {
        let entries = self.entries.read();
        let entry = entries.get(&(provider.to_string(), model.to_string()))?;
        if Utc::now() - entry.last_validated > self.ttl {
            return None;
        }
        Some(entry.clone())
    }

    /// Records an outcome for `(provider, model)`.
    pub fn put(&self, provider: &str, model: &str, dimension: Option<u64>, valid: bool, error: Option<String>) {
        self.entries.write().insert(
            (provider.to_string(), model.to_string()),
            DimCacheEntry {
                dimension,
                valid,
                last_validated: Utc::now(),
                last_error: error,
            },
        );
    }

    /// Returns every cached (provider, model) pair, regardless of staleness — used by
    /// `validate_all`'s refresh pass to know what to re-check.
    pub fn known_pairs(&self) -> Vec<(String, String)> {
        self.entries.read().keys().cloned().collect()
    }
}
