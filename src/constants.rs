//! Cross-cutting, shared constants.
//!
//! # Dimension Invariants
//!
//! A tenant's vector collection must never hold a vector whose length disagrees with
//! the dimension of the tenant's current embedding configuration.
//! [`validate_dimension`] is the single choke point used at every boundary that writes
//! a vector into a collection (cache residual persistence, migration data-migration
//! phase, dedup merge) so a mismatch is caught at the write site rather than surfacing
//! as a corrupt read later.

use std::time::Duration;

/// Default cache entry ceiling before LRU eviction kicks in.
pub const DEFAULT_CACHE_CEILING: u64 = 10_000;
/// Default cache entry TTL.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 604_800;
/// Fraction of the ceiling evicted on overflow.
pub const EVICTION_BATCH_FRACTION: f64 = 0.10;

/// Default warming batch size.
pub const DEFAULT_WARMING_BATCH_SIZE: usize = 10;
/// Default max concurrent warming processors (global singleton guard still enforces 1).
pub const DEFAULT_WARMING_MAX_CONCURRENT: usize = 3;
/// Default retention, in days, for terminal warming tasks.
pub const DEFAULT_WARMING_TASK_RETENTION_DAYS: i64 = 7;
/// Singleton processing flag TTL for the warming scheduler.
pub const WARMING_LOCK_TTL_SECS: u64 = 600;

/// Minimum interval between maintenance passes.
pub const DEFAULT_MAINTENANCE_MIN_INTERVAL_SECS: u64 = 3_600;

/// Default migration batch size.
pub const DEFAULT_MIGRATION_BATCH_SIZE: usize = 50;
/// Default migration retry attempts per batch.
pub const DEFAULT_MIGRATION_MAX_RETRIES: u32 = 3;
/// Default initial retry backoff; doubled per attempt.
pub const DEFAULT_MIGRATION_RETRY_BACKOFF_SECS: u64 = 2;
/// Default migration wall-clock timeout.
pub const DEFAULT_MIGRATION_TIMEOUT_SECS: u64 = 3_600;
/// Migration failure-ratio circuit breaker.
pub const MIGRATION_FAILURE_RATIO_STOP: f64 = 0.5;
/// How long a terminal migration's progress record is retained in memory.
pub const MIGRATION_PROGRESS_RETENTION: Duration = Duration::from_secs(5 * 60);
/// Maximum number of migrations active (non-terminal) at once, globally.
pub const DEFAULT_MIGRATION_MAX_CONCURRENT: usize = 3;

/// Default analytics snapshot interval.
pub const DEFAULT_ANALYTICS_SNAPSHOT_SECS: u64 = 300;
/// Default analytics retention, in days.
pub const DEFAULT_ANALYTICS_RETENTION_DAYS: i64 = 30;

/// Default dimension-compatibility cache TTL, in hours.
pub const DEFAULT_COMPAT_CACHE_TTL_HOURS: i64 = 24;

/// Error returned when a vector's dimension disagrees with the expected dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionMismatch {
    /// Dimension the caller expected (the tenant's current configuration).
    pub expected: usize,
    /// Dimension actually observed on the vector.
    pub actual: usize,
}

impl std::fmt::Display for DimensionMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "dimension mismatch: expected {}, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for DimensionMismatch {}

/// Validates that `actual` matches `expected`, the single choke point for invariant 1.
pub fn validate_dimension(actual: usize, expected: usize) -> Result<(), DimensionMismatch> {
    if actual != expected {
        return Err(DimensionMismatch { expected, actual });
    }
    Ok(())
}
