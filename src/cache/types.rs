//! Cache Core, Analytics, and Warming Scheduler data model.

use chrono::{DateTime, Utc};

/// One cached embedding. Keyed externally by
/// [`crate::hashing::cache_key`]; this struct is the value side of that map.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached vector.
    pub vector: Vec<f32>,
    /// Provider tag this vector was computed under.
    pub provider: String,
    /// Model tag this vector was computed under.
    pub model: String,
    /// Length of the original (pre-normalization) text, used for memory sampling.
    pub text_length: usize,
    /// When this entry was written.
    pub created_at: DateTime<Utc>,
    /// When this entry expires, if it has a TTL.
    pub expires_at: Option<DateTime<Utc>>,
    /// Hit count. Updated best-effort on every hit; a lost update here is acceptable.
    pub access_count: u64,
    /// Last time this entry was read. Drives LRU eviction ordering.
    pub last_accessed: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether this entry's TTL has elapsed.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() > expires_at)
    }
}

/// Counters and derived figures for the cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Total `get`/`get_batch` lookups attempted (per-text for batches).
    pub total_requests: u64,
    /// Lookups that found a live entry.
    pub hits: u64,
    /// Lookups that found nothing or an expired entry.
    pub misses: u64,
    /// Entries removed by ceiling-triggered LRU eviction.
    pub evictions: u64,
    /// Current entry count, scan-derived.
    pub total_entries: u64,
    /// Sampled estimate of cache memory usage, in megabytes.
    pub estimated_memory_mb: f64,
}

impl CacheStats {
    /// `hits / total_requests`, or `0.0` when there have been no requests.
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests > 0 {
            self.hits as f64 / self.total_requests as f64
        } else {
            0.0
        }
    }
}

/// Direction of the hit-rate trend relative to its 24h average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    /// Not enough history to judge.
    Unknown,
    /// Current hit rate exceeds the 24h average by more than 0.05.
    Improving,
    /// Current hit rate trails the 24h average by more than 0.05.
    Declining,
    /// Within 0.05 of the 24h average.
    Stable,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Improving => "improving",
            Self::Declining => "declining",
            Self::Stable => "stable",
        };
        f.write_str(s)
    }
}

/// Result of [`super::analytics::CacheAnalytics::hit_rate_trends`].
#[derive(Debug, Clone)]
pub struct HitRateTrends {
    /// Current (live) hit rate.
    pub current: f64,
    /// Average hit rate over the last 24h of snapshots, if any exist.
    pub avg_24h: Option<f64>,
    /// Average hit rate over the last 7d of snapshots, if any exist.
    pub avg_7d: Option<f64>,
    /// Direction relative to `avg_24h`.
    pub trend: TrendDirection,
    /// Free-text suggestions tied to the trend.
    pub recommendations: Vec<String>,
}

/// Overall qualitative cache health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthRating {
    /// No traffic observed yet; score is not meaningful.
    Unknown,
    /// score >= 0.8.
    Excellent,
    /// score >= 0.6.
    Good,
    /// score >= 0.4.
    Fair,
    /// score < 0.4.
    Poor,
}

impl std::fmt::Display for HealthRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        };
        f.write_str(s)
    }
}

/// Priority tag on a [`Recommendation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationPriority {
    /// Informational.
    Low,
    /// Worth acting on.
    Medium,
    /// Degrading cache effectiveness now.
    High,
}

/// One deterministic, rule-derived suggestion.
#[derive(Debug, Clone)]
pub struct Recommendation {
    /// How urgent this recommendation is.
    pub priority: RecommendationPriority,
    /// Human-readable suggestion.
    pub message: String,
}

/// Hit counters broken down by (provider, model).
#[derive(Debug, Clone)]
pub struct ProviderBreakdownEntry {
    /// Provider tag.
    pub provider: String,
    /// Model tag.
    pub model: String,
    /// Cache hits served for this (provider, model) pair.
    pub hits: u64,
}

/// Composite report returned by [`super::analytics::CacheAnalytics::health_report`].
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Qualitative bucket.
    pub rating: HealthRating,
    /// Raw weighted score in [0, 1].
    pub score: f64,
    /// Current hit rate.
    pub hit_rate: f64,
    /// `1 - (MB per entry / 10)`, clamped to `[0, 1]` from below.
    pub memory_efficiency: f64,
    /// Hit-rate trend detail.
    pub trends: HitRateTrends,
    /// Deterministic rule-derived suggestions.
    pub recommendations: Vec<Recommendation>,
    /// Per-(provider, model) hit breakdown.
    pub usage_patterns: Vec<ProviderBreakdownEntry>,
}

/// Lifecycle status of a [`WarmingTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmingStatus {
    /// Queued, not yet picked up by the processor.
    Pending,
    /// Actively being processed.
    Running,
    /// Terminal: every batch was attempted.
    Completed,
    /// Terminal: an unrecoverable error stopped the task.
    Failed,
    /// Terminal: cancelled before the processor reached it.
    Cancelled,
}

impl WarmingStatus {
    /// Whether this status will never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// A precompute request for the warming scheduler.
#[derive(Debug, Clone)]
pub struct WarmingTask {
    /// Task id.
    pub id: String,
    /// Texts to precompute, in the order they'll be batched.
    pub texts: Vec<String>,
    /// Target provider tag.
    pub provider: String,
    /// Target model tag.
    pub model: String,
    /// Priority, 1 (lowest) to 10 (highest); higher dequeues first.
    pub priority: u8,
    /// Current status.
    pub status: WarmingStatus,
    /// Fraction of texts processed so far, in `[0, 1]`.
    pub progress: f64,
    /// Set when `status == Failed`.
    pub error: Option<String>,
    /// When this task was scheduled.
    pub created_at: DateTime<Utc>,
    /// When this task reached a terminal status, used for 7-day retention sweeping.
    pub terminal_at: Option<DateTime<Utc>>,
}
