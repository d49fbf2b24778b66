//! Periodic cache health and trend reporting over a [`CacheCoreHandle`].

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::core::CacheCoreHandle;
use super::types::{
    CacheStats, HealthRating, HealthReport, HitRateTrends, ProviderBreakdownEntry, Recommendation,
    RecommendationPriority, TrendDirection,
};
use crate::constants::{DEFAULT_ANALYTICS_RETENTION_DAYS, DEFAULT_ANALYTICS_SNAPSHOT_SECS};

#[derive(Debug, Clone)]
struct Snapshot {
    taken_at: DateTime<Utc>,
    stats: CacheStats,
}

/// Takes periodic stats snapshots and derives trend/health reporting from them.
/// Snapshots are kept in a retention-bounded, timestamp-keyed series, matching a
/// Redis-class `cache_history:<epoch>` layout, modeled here as an in-process map.
pub struct CacheAnalytics {
    cache: CacheCoreHandle,
    history: RwLock<BTreeMap<i64, Snapshot>>,
    snapshot_interval: Duration,
    retention: chrono::Duration,
}

impl CacheAnalytics {
    /// Builds an analytics reporter over `cache` with the default snapshot interval
    /// and retention.
    pub fn new(cache: CacheCoreHandle) -> Self {
        Self::with_config(
            cache,
            Duration::from_secs(DEFAULT_ANALYTICS_SNAPSHOT_SECS),
            DEFAULT_ANALYTICS_RETENTION_DAYS,
        )
    }

    /// Builds an analytics reporter with explicit snapshot cadence and retention.
    pub fn with_config(cache: CacheCoreHandle, snapshot_interval: Duration, retention_days: i64) -> Self {
        Self {
            cache,
            history: RwLock::new(BTreeMap::new()),
            snapshot_interval,
            retention: chrono::Duration::days(retention_days),
        }
    }

    /// Takes a snapshot if at least `snapshot_interval` has elapsed since the last
    /// one; a no-op cheap enough to call from any maintenance loop. Returns whether a
    /// snapshot was actually taken.
    pub fn snapshot_if_due(&self) -> bool {
        let now = Utc::now();
        let due = {
            let history = self.history.read();
            match history.values().next_back() {
                Some(last) => (now - last.taken_at)
                    .to_std()
                    .map(|elapsed| elapsed >= self.snapshot_interval)
                    .unwrap_or(true),
                None => true,
            }
        };
        if due {
            self.force_snapshot();
        }
        due
    }

    /// Takes a snapshot unconditionally and sweeps expired history.
    pub fn force_snapshot(&self) {
        let now = Utc::now();
        let stats = self.cache.stats();
        let mut history = self.history.write();
        history.insert(now.timestamp(), Snapshot { taken_at: now, stats });
        let cutoff = now - self.retention;
        history.retain(|_, snapshot| snapshot.taken_at >= cutoff);
    }

    fn avg_hit_rate_since(&self, window: chrono::Duration) -> Option<f64> {
        let cutoff = Utc::now() - window;
        let history = self.history.read();
        let samples: Vec<f64> = history
            .values()
            .filter(|snapshot| snapshot.taken_at >= cutoff)
            .map(|snapshot| snapshot.stats.hit_rate())
            .collect();
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    /// Current hit rate against its 24h/7d rolling averages.
    pub fn hit_rate_trends(&self) -> HitRateTrends {
        let current = self.cache.stats().hit_rate();
        let avg_24h = self.avg_hit_rate_since(chrono::Duration::hours(24));
        let avg_7d = self.avg_hit_rate_since(chrono::Duration::days(7));
        let trend = match avg_24h {
            None => TrendDirection::Unknown,
            Some(avg) if current > avg + 0.05 => TrendDirection::Improving,
            Some(avg) if current < avg - 0.05 => TrendDirection::Declining,
            Some(_) => TrendDirection::Stable,
        };
        let mut recommendations = Vec::new();
        if trend == TrendDirection::Declining {
            recommendations.push("hit rate is declining; consider warming frequent queries".to_string());
        }
        HitRateTrends { current, avg_24h, avg_7d, trend, recommendations }
    }

    /// Cache hits grouped by (provider, model), sorted by volume.
    pub fn provider_breakdown(&self) -> Vec<ProviderBreakdownEntry> {
        let mut entries: Vec<ProviderBreakdownEntry> = self
            .cache
            .provider_model_hits()
            .into_iter()
            .map(|((provider, model), hits)| ProviderBreakdownEntry { provider, model, hits })
            .collect();
        entries.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.provider.cmp(&b.provider)));
        entries
    }

    /// Weighted health score plus qualitative rating and suggestions.
    pub fn health_report(&self) -> HealthReport {
        let stats = self.cache.stats();
        if stats.total_requests == 0 {
            return HealthReport {
                rating: HealthRating::Unknown,
                score: 0.0,
                hit_rate: 0.0,
                memory_efficiency: 0.0,
                trends: self.hit_rate_trends(),
                recommendations: vec![Recommendation {
                    priority: RecommendationPriority::Low,
                    message: "no traffic observed yet".to_string(),
                }],
                usage_patterns: self.provider_breakdown(),
            };
        }

        let hit_rate = stats.hit_rate();
        let mb_per_entry = if stats.total_entries > 0 {
            stats.estimated_memory_mb / stats.total_entries as f64
        } else {
            0.0
        };
        let eviction_ratio = stats.evictions as f64 / stats.total_requests as f64;
        let memory_efficiency = (1.0 - mb_per_entry / 10.0).max(0.0);
        let score = (0.4 * (hit_rate / 0.8).min(1.0)
            + 0.3 * memory_efficiency
            + 0.3 * (1.0 - 10.0 * eviction_ratio).max(0.0))
        .clamp(0.0, 1.0);

        let rating = if score >= 0.8 {
            HealthRating::Excellent
        } else if score >= 0.6 {
            HealthRating::Good
        } else if score >= 0.4 {
            HealthRating::Fair
        } else {
            HealthRating::Poor
        };

        let mut recommendations = Vec::new();
        if hit_rate < 0.4 {
            recommendations.push(Recommendation {
                priority: RecommendationPriority::High,
                message: "hit rate is low; adopt warming for frequent queries".to_string(),
            });
        }
        if stats.estimated_memory_mb > 1024.0 {
            recommendations.push(Recommendation {
                priority: RecommendationPriority::Medium,
                message: "cache memory usage is high; tighten the LRU ceiling or TTL".to_string(),
            });
        }
        if stats.evictions > 100 {
            recommendations.push(Recommendation {
                priority: RecommendationPriority::Medium,
                message: "eviction volume is high; enlarge the cache ceiling".to_string(),
            });
        }

        HealthReport {
            rating,
            score,
            hit_rate,
            memory_efficiency,
            trends: self.hit_rate_trends(),
            recommendations,
            usage_patterns: self.provider_breakdown(),
        }
    }

    /// Dumps stats, health, and provider breakdown as a JSON value.
    pub fn export(&self) -> serde_json::Value {
        let stats = self.cache.stats();
        let health = self.health_report();
        serde_json::json!({
            "stats": {
                "total_requests": stats.total_requests,
                "hits": stats.hits,
                "misses": stats.misses,
                "evictions": stats.evictions,
                "hit_rate": stats.hit_rate(),
                "total_entries": stats.total_entries,
                "estimated_memory_mb": stats.estimated_memory_mb,
            },
            "health": {
                "rating": health.rating.to_string(),
                "score": health.score,
            },
            "provider_breakdown": self.provider_breakdown().into_iter().map(|entry| {
                serde_json::json!({
                    "provider": entry.provider,
                    "model": entry.model,
                    "hits": entry.hits,
                })
            }).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_report_is_unknown_with_no_traffic() {
        let analytics = CacheAnalytics::new(CacheCoreHandle::new());
        assert_eq!(analytics.health_report().rating, HealthRating::Unknown);
    }

    #[test]
    fn high_hit_rate_scores_excellent() {
        let cache = CacheCoreHandle::new();
        cache.put("a", "cloud-a", "m1", vec![1.0], None);
        for _ in 0..20 {
            cache.get("a", "cloud-a", "m1");
        }
        let analytics = CacheAnalytics::new(cache);
        let report = analytics.health_report();
        assert!(report.hit_rate > 0.9);
        assert_eq!(report.rating, HealthRating::Excellent);
    }

    #[test]
    fn low_hit_rate_recommends_warming() {
        let cache = CacheCoreHandle::new();
        for i in 0..10 {
            cache.get(&format!("miss-{i}"), "cloud-a", "m1");
        }
        let analytics = CacheAnalytics::new(cache);
        let report = analytics.health_report();
        assert!(report.recommendations.iter().any(|r| r.message.contains("warming")));
    }

    #[test]
    fn trend_is_unknown_before_any_snapshot_exists() {
        let analytics = CacheAnalytics::new(CacheCoreHandle::new());
        assert_eq!(analytics.hit_rate_trends().trend, TrendDirection::Unknown);
    }

    #[test]
    fn provider_breakdown_sorts_by_hit_volume() {
        let cache = CacheCoreHandle::new();
        cache.put("a", "cloud-a", "m1", vec![1.0], None);
        cache.put("b", "cloud-b", "m1", vec![1.0], None);
        cache.get("a", "cloud-a", "m1");
        cache.get("b", "cloud-b", "m1");
        cache.get("b", "cloud-b", "m1");
        let analytics = CacheAnalytics::new(cache);
        let breakdown = analytics.provider_breakdown();
        assert_eq!(breakdown[0].provider, "cloud-b");
        assert_eq!(breakdown[0].hits, 2);
    }
}
