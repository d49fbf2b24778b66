//! Cache Core, Cache Analytics, and the Warming Scheduler.

pub mod analytics;
pub mod core;
pub mod error;
pub mod types;
pub mod warming;

pub use analytics::CacheAnalytics;
pub use core::{CacheCore, CacheCoreHandle};
pub use error::CacheError;
pub use types::{
    CacheEntry, CacheStats, HealthRating, HealthReport, HitRateTrends, ProviderBreakdownEntry,
    Recommendation, RecommendationPriority, TrendDirection, WarmingStatus, WarmingTask,
};
pub use warming::WarmingScheduler;
