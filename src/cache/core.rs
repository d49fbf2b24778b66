//! Content-addressed embedding cache.
//!
//! Backed by an unbounded `moka` map. Eviction is policy-driven — oldest
//! `last_accessed` first, in batches of [`EVICTION_BATCH_FRACTION`] of the ceiling —
//! rather than moka's own size-based LRU, because the eviction unit here is "10% of
//! ceiling at a time", not "one entry per insert over capacity".

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use parking_lot::RwLock;

use super::types::{CacheEntry, CacheStats};
use crate::constants::{
    DEFAULT_CACHE_CEILING, DEFAULT_CACHE_TTL_SECS, DEFAULT_MAINTENANCE_MIN_INTERVAL_SECS,
    EVICTION_BATCH_FRACTION,
};
use crate::hashing::cache_key;

#[derive(Default)]
struct Counters {
    total_requests: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// The embedding cache. Cheap to construct, not cheap to clone — share it behind
/// [`CacheCoreHandle`].
pub struct CacheCore {
    entries: Cache<String, CacheEntry>,
    ceiling: u64,
    default_ttl: Duration,
    counters: RwLock<Counters>,
    provider_model_hits: RwLock<HashMap<(String, String), u64>>,
    last_cleanup: RwLock<Option<DateTime<Utc>>>,
}

impl CacheCore {
    /// Creates a cache with the default ceiling and TTL.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CEILING, Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }

    /// Creates a cache with an explicit entry ceiling and default TTL.
    pub fn with_config(ceiling: u64, default_ttl: Duration) -> Self {
        Self {
            entries: Cache::builder().build(),
            ceiling,
            default_ttl,
            counters: RwLock::new(Counters::default()),
            provider_model_hits: RwLock::new(HashMap::new()),
            last_cleanup: RwLock::new(None),
        }
    }

    /// Looks up the cached vector for `(text, provider, model)`. Empty/whitespace-only
    /// text is a permanent miss, never looked up or counted.
    pub fn get(&self, text: &str, provider: &str, model: &str) -> Option<Vec<f32>> {
        if text.trim().is_empty() {
            return None;
        }
        let key = cache_key(text, provider, model);
        self.counters.write().total_requests += 1;
        match self.entries.get(&key) {
            Some(entry) if !entry.is_expired() => {
                self.counters.write().hits += 1;
                *self
                    .provider_model_hits
                    .write()
                    .entry((provider.to_string(), model.to_string()))
                    .or_insert(0) += 1;
                let mut refreshed = entry;
                refreshed.access_count += 1;
                refreshed.last_accessed = Utc::now();
                let vector = refreshed.vector.clone();
                self.entries.insert(key, refreshed);
                Some(vector)
            }
            Some(_) => {
                self.entries.invalidate(&key);
                self.counters.write().misses += 1;
                None
            }
            None => {
                self.counters.write().misses += 1;
                None
            }
        }
    }

    /// Batch form of [`Self::get`]. Returns one slot per input (holes as `None`) plus
    /// the indices of those holes.
    pub fn get_batch(
        &self,
        texts: &[String],
        provider: &str,
        model: &str,
    ) -> (Vec<Option<Vec<f32>>>, Vec<usize>) {
        let mut out = Vec::with_capacity(texts.len());
        let mut missing = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let hit = self.get(text, provider, model);
            if hit.is_none() {
                missing.push(i);
            }
            out.push(hit);
        }
        (out, missing)
    }

    /// Stores `vector` for `(text, provider, model)` with an optional TTL override.
    /// Empty/whitespace-only text is silently dropped, never cached.
    pub fn put(&self, text: &str, provider: &str, model: &str, vector: Vec<f32>, ttl: Option<Duration>) {
        if text.trim().is_empty() {
            return;
        }
        let key = cache_key(text, provider, model);
        let now = Utc::now();
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry {
            vector,
            provider: provider.to_string(),
            model: model.to_string(),
            text_length: text.len(),
            created_at: now,
            expires_at: chrono::Duration::from_std(ttl).ok().map(|d| now + d),
            access_count: 0,
            last_accessed: now,
        };
        self.entries.insert(key, entry);
        self.evict_if_over_ceiling();
    }

    /// Batch form of [`Self::put`].
    pub fn put_batch(&self, items: &[(String, Vec<f32>)], provider: &str, model: &str, ttl: Option<Duration>) {
        for (text, vector) in items {
            self.put(text, provider, model, vector.clone(), ttl);
        }
    }

    /// Removes every entry, or just those matching `provider`/`model` when given.
    pub fn clear(&self, provider: Option<&str>, model: Option<&str>) {
        match (provider, model) {
            (None, None) => self.entries.invalidate_all(),
            _ => {
                let victims: Vec<String> = self
                    .entries
                    .iter()
                    .filter(|(_, entry)| {
                        provider.is_none_or(|p| entry.provider == p) && model.is_none_or(|m| entry.model == m)
                    })
                    .map(|(key, _)| (*key).clone())
                    .collect();
                for key in victims {
                    self.entries.invalidate(&key);
                }
            }
        }
        self.entries.run_pending_tasks();
    }

    /// Removes expired and corrupt entries. Rate-limited to once per
    /// [`DEFAULT_MAINTENANCE_MIN_INTERVAL_SECS`]; calls inside the window are a no-op
    /// returning `0`. Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> u64 {
        let now = Utc::now();
        {
            let mut last = self.last_cleanup.write();
            if let Some(previous) = *last {
                if (now - previous).num_seconds() < DEFAULT_MAINTENANCE_MIN_INTERVAL_SECS as i64 {
                    return 0;
                }
            }
            *last = Some(now);
        }
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| (*key).clone())
            .collect();
        for key in &expired {
            self.entries.invalidate(key);
        }
        self.entries.run_pending_tasks();
        expired.len() as u64
    }

    /// Current counters plus scan-derived size figures.
    pub fn stats(&self) -> CacheStats {
        let counters = self.counters.read();
        CacheStats {
            total_requests: counters.total_requests,
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            total_entries: self.entries.entry_count(),
            estimated_memory_mb: self.sample_estimated_memory_mb(),
        }
    }

    /// Cache hits broken down by (provider, model), for analytics.
    pub fn provider_model_hits(&self) -> HashMap<(String, String), u64> {
        self.provider_model_hits.read().clone()
    }

    fn sample_estimated_memory_mb(&self) -> f64 {
        const SAMPLE_LIMIT: usize = 200;
        let mut sampled = 0usize;
        let mut bytes = 0usize;
        for (_, entry) in self.entries.iter() {
            bytes += entry.vector.len() * std::mem::size_of::<f32>() + entry.text_length + 96;
            sampled += 1;
            if sampled >= SAMPLE_LIMIT {
                break;
            }
        }
        if sampled == 0 {
            return 0.0;
        }
        let avg_bytes_per_entry = bytes as f64 / sampled as f64;
        (avg_bytes_per_entry * self.entries.entry_count() as f64) / (1024.0 * 1024.0)
    }

    fn evict_if_over_ceiling(&self) {
        self.entries.run_pending_tasks();
        let count = self.entries.entry_count();
        if count <= self.ceiling {
            return;
        }
        let batch = ((self.ceiling as f64) * EVICTION_BATCH_FRACTION).ceil().max(1.0) as usize;
        let mut by_age: Vec<(String, DateTime<Utc>)> = self
            .entries
            .iter()
            .map(|(key, entry)| ((*key).clone(), entry.last_accessed))
            .collect();
        by_age.sort_by_key(|(_, last_accessed)| *last_accessed);
        let mut evicted = 0u64;
        for (key, _) in by_age.into_iter().take(batch) {
            self.entries.invalidate(&key);
            evicted += 1;
        }
        self.entries.run_pending_tasks();
        self.counters.write().evictions += evicted;
    }
}

impl Default for CacheCore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCore")
            .field("entries", &self.entries.entry_count())
            .field("ceiling", &self.ceiling)
            .finish()
    }
}

/// Shared handle to a [`CacheCore`]: cheap to clone, every clone sees the same
/// underlying cache.
#[derive(Clone)]
pub struct CacheCoreHandle {
    inner: Arc<CacheCore>,
}

impl CacheCoreHandle {
    /// Wraps a new default-configured [`CacheCore`].
    pub fn new() -> Self {
        Self { inner: Arc::new(CacheCore::new()) }
    }

    /// Wraps a new [`CacheCore`] with an explicit ceiling and TTL.
    pub fn with_config(ceiling: u64, default_ttl: Duration) -> Self {
        Self { inner: Arc::new(CacheCore::with_config(ceiling, default_ttl)) }
    }

    /// See [`CacheCore::get`].
    pub fn get(&self, text: &str, provider: &str, model: &str) -> Option<Vec<f32>> {
        self.inner.get(text, provider, model)
    }

    /// See [`CacheCore::get_batch`].
    pub fn get_batch(&self, texts: &[String], provider: &str, model: &str) -> (Vec<Option<Vec<f32>>>, Vec<usize>) {
        self.inner.get_batch(texts, provider, model)
    }

    /// See [`CacheCore::put`].
    pub fn put(&self, text: &str, provider: &str, model: &str, vector: Vec<f32>, ttl: Option<Duration>) {
        self.inner.put(text, provider, model, vector, ttl)
    }

    /// See [`CacheCore::put_batch`].
    pub fn put_batch(&self, items: &[(String, Vec<f32>)], provider: &str, model: &str, ttl: Option<Duration>) {
        self.inner.put_batch(items, provider, model, ttl)
    }

    /// See [`CacheCore::clear`].
    pub fn clear(&self, provider: Option<&str>, model: Option<&str>) {
        self.inner.clear(provider, model)
    }

    /// See [`CacheCore::cleanup_expired`].
    pub fn cleanup_expired(&self) -> u64 {
        self.inner.cleanup_expired()
    }

    /// See [`CacheCore::stats`].
    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }

    /// See [`CacheCore::provider_model_hits`].
    pub fn provider_model_hits(&self) -> HashMap<(String, String), u64> {
        self.inner.provider_model_hits()
    }

    /// Number of strong references to the underlying cache.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl Default for CacheCoreHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheCoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCoreHandle")
            .field("strong_count", &self.strong_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit_after_put() {
        let cache = CacheCore::new();
        assert!(cache.get("hello", "cloud-a", "m1").is_none());
        cache.put("hello", "cloud-a", "m1", vec![1.0, 2.0], None);
        assert_eq!(cache.get("hello", "cloud-a", "m1"), Some(vec![1.0, 2.0]));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn normalization_makes_differently_cased_text_collide() {
        let cache = CacheCore::new();
        cache.put("Hello   World", "cloud-a", "m1", vec![1.0], None);
        assert_eq!(cache.get("hello world", "cloud-a", "m1"), Some(vec![1.0]));
    }

    #[test]
    fn empty_text_is_a_permanent_miss_and_is_never_stored() {
        let cache = CacheCore::new();
        cache.put("   ", "cloud-a", "m1", vec![1.0], None);
        assert!(cache.get("   ", "cloud-a", "m1").is_none());
        assert_eq!(cache.stats().total_requests, 0);
    }

    #[test]
    fn get_batch_reports_hole_indices() {
        let cache = CacheCore::new();
        cache.put("a", "cloud-a", "m1", vec![1.0], None);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let (results, missing) = cache.get_batch(&texts, "cloud-a", "m1");
        assert_eq!(results[0], Some(vec![1.0]));
        assert_eq!(results[1], None);
        assert_eq!(results[2], None);
        assert_eq!(missing, vec![1, 2]);
    }

    #[test]
    fn ttl_in_the_past_expires_immediately() {
        let cache = CacheCore::new();
        cache.put("a", "cloud-a", "m1", vec![1.0], Some(Duration::from_secs(0)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("a", "cloud-a", "m1").is_none());
    }

    #[test]
    fn clear_scoped_to_provider_leaves_other_providers_intact() {
        let cache = CacheCore::new();
        cache.put("a", "cloud-a", "m1", vec![1.0], None);
        cache.put("a", "cloud-b", "m1", vec![2.0], None);
        cache.clear(Some("cloud-a"), None);
        assert!(cache.get("a", "cloud-a", "m1").is_none());
        assert_eq!(cache.get("a", "cloud-b", "m1"), Some(vec![2.0]));
    }

    #[test]
    fn overflow_evicts_oldest_by_last_accessed() {
        let cache = CacheCore::with_config(10, Duration::from_secs(3600));
        for i in 0..11 {
            cache.put(&format!("text-{i}"), "cloud-a", "m1", vec![i as f32], None);
        }
        // Ceiling 10, eviction batch = ceil(10 * 0.10) = 1; the oldest entry (text-0)
        // should be gone.
        assert!(cache.get("text-0", "cloud-a", "m1").is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn handle_clones_share_the_same_cache() {
        let handle = CacheCoreHandle::new();
        let clone = handle.clone();
        handle.put("a", "cloud-a", "m1", vec![1.0], None);
        assert_eq!(clone.get("a", "cloud-a", "m1"), Some(vec![1.0]));
        assert_eq!(handle.strong_count(), 2);
    }
}
