//! Environment-backed configuration for every ECCMS component.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::time::Duration;

use crate::dedup::{DedupStrategy, DedupThresholds};

/// Text normalization policy applied at cache key derivation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheNormalization {
    /// Collapse whitespace and lowercase (the default, and the only policy exercised
    /// by the boundary scenario tests).
    WhitespaceLowercase,
    /// No normalization; the raw text is hashed as-is.
    None,
}

impl std::str::FromStr for CacheNormalization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whitespace+lowercase" => Ok(Self::WhitespaceLowercase),
            "none" => Ok(Self::None),
            other => Err(format!("unknown cache normalization policy: {other}")),
        }
    }
}

/// Cache Core configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum entry count before LRU eviction runs.
    pub ceiling: u64,
    /// Entry TTL.
    pub ttl: Duration,
    /// Normalization policy.
    pub normalization: CacheNormalization,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ceiling: crate::constants::DEFAULT_CACHE_CEILING,
            ttl: Duration::from_secs(crate::constants::DEFAULT_CACHE_TTL_SECS),
            normalization: CacheNormalization::WhitespaceLowercase,
        }
    }
}

/// Warming Scheduler configuration.
#[derive(Debug, Clone)]
pub struct WarmingConfig {
    /// Texts per precompute batch.
    pub batch_size: usize,
    /// Maximum concurrent warming tasks admitted by policy (the processor itself is
    /// still a global singleton; this bounds how many tasks may be `pending`/`running`
    /// at once before `schedule` starts rejecting).
    pub max_concurrent: usize,
    /// Days a terminal task record is retained.
    pub task_retention_days: i64,
}

impl Default for WarmingConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::constants::DEFAULT_WARMING_BATCH_SIZE,
            max_concurrent: crate::constants::DEFAULT_WARMING_MAX_CONCURRENT,
            task_retention_days: crate::constants::DEFAULT_WARMING_TASK_RETENTION_DAYS,
        }
    }
}

/// Migration Engine configuration.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Chunks migrated per batch.
    pub batch_size: usize,
    /// Retry attempts per failed batch.
    pub max_retries: u32,
    /// Initial retry backoff, doubled per attempt.
    pub retry_backoff: Duration,
    /// Wall-clock timeout for the whole migration.
    pub timeout: Duration,
    /// Whether to run the optional verification phase.
    pub verify: bool,
    /// Whether rollback is available on failure/cancel.
    pub enable_rollback: bool,
    /// Global cap on concurrently active migrations.
    pub max_concurrent: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::constants::DEFAULT_MIGRATION_BATCH_SIZE,
            max_retries: crate::constants::DEFAULT_MIGRATION_MAX_RETRIES,
            retry_backoff: Duration::from_secs(crate::constants::DEFAULT_MIGRATION_RETRY_BACKOFF_SECS),
            timeout: Duration::from_secs(crate::constants::DEFAULT_MIGRATION_TIMEOUT_SECS),
            verify: true,
            enable_rollback: true,
            max_concurrent: crate::constants::DEFAULT_MIGRATION_MAX_CONCURRENT,
        }
    }
}

/// Cache Analytics configuration.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Interval between periodic snapshots.
    pub snapshot_interval: Duration,
    /// Time-series retention, in days.
    pub retention_days: i64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: Duration::from_secs(crate::constants::DEFAULT_ANALYTICS_SNAPSHOT_SECS),
            retention_days: crate::constants::DEFAULT_ANALYTICS_RETENTION_DAYS,
        }
    }
}

/// Compatibility Validator configuration.
#[derive(Debug, Clone)]
pub struct CompatConfig {
    /// Dimension Compatibility Cache soft TTL, in hours.
    pub cache_ttl_hours: i64,
}

impl Default for CompatConfig {
    fn default() -> Self {
        Self {
            cache_ttl_hours: crate::constants::DEFAULT_COMPAT_CACHE_TTL_HOURS,
        }
    }
}

/// Dedup Engine configuration.
#[derive(Debug, Clone)]
pub struct DedupConfig {
    /// Whether the manager accepts dedup operations without a force-override.
    pub enabled: bool,
    /// Whether cross-document merges are permitted.
    pub cross_document_allowed: bool,
    /// Similarity tier thresholds.
    pub thresholds: DedupThresholds,
    /// Merge strategy.
    pub strategy: DedupStrategy,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cross_document_allowed: false,
            thresholds: DedupThresholds::default(),
            strategy: DedupStrategy::Conservative,
        }
    }
}

/// Top-level ECCMS configuration, assembled from per-component configs.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Cache Core settings.
    pub cache: CacheConfig,
    /// Warming Scheduler settings.
    pub warming: WarmingConfig,
    /// Minimum interval between forced maintenance passes.
    pub maintenance_min_interval: MaintenanceConfig,
    /// Migration Engine settings.
    pub migration: MigrationConfig,
    /// Cache Analytics settings.
    pub analytics: AnalyticsConfig,
    /// Compatibility Validator settings.
    pub compat: CompatConfig,
    /// Dedup Engine settings.
    pub dedup: DedupConfig,
}

/// Maintenance cadence guard.
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Minimum interval between forced maintenance passes.
    pub min_interval: Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(
                crate::constants::DEFAULT_MAINTENANCE_MIN_INTERVAL_SECS,
            ),
        }
    }
}

impl Config {
    const ENV_CACHE_CEILING: &'static str = "ECCMS_CACHE_CEILING";
    const ENV_CACHE_TTL_SECONDS: &'static str = "ECCMS_CACHE_TTL_SECONDS";
    const ENV_CACHE_NORMALIZATION: &'static str = "ECCMS_CACHE_NORMALIZATION";
    const ENV_WARMING_BATCH_SIZE: &'static str = "ECCMS_WARMING_BATCH_SIZE";
    const ENV_MIGRATION_BATCH_SIZE: &'static str = "ECCMS_MIGRATION_BATCH_SIZE";
    const ENV_MIGRATION_MAX_RETRIES: &'static str = "ECCMS_MIGRATION_MAX_RETRIES";
    const ENV_MIGRATION_TIMEOUT_SECONDS: &'static str = "ECCMS_MIGRATION_TIMEOUT_SECONDS";
    const ENV_ANALYTICS_SNAPSHOT_SECONDS: &'static str = "ECCMS_ANALYTICS_SNAPSHOT_SECONDS";
    const ENV_COMPAT_CACHE_TTL_HOURS: &'static str = "ECCMS_COMPAT_CACHE_TTL_HOURS";

    /// Loads configuration from the environment, falling back to documented defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = Self::parse_u64_env(Self::ENV_CACHE_CEILING)? {
            config.cache.ceiling = v;
        }
        if let Some(v) = Self::parse_u64_env(Self::ENV_CACHE_TTL_SECONDS)? {
            config.cache.ttl = Duration::from_secs(v);
        }
        if let Ok(v) = env::var(Self::ENV_CACHE_NORMALIZATION) {
            config.cache.normalization = v
                .parse()
                .map_err(|reason| ConfigError::InvalidValue {
                    name: Self::ENV_CACHE_NORMALIZATION,
                    reason,
                })?;
        }
        if let Some(v) = Self::parse_u64_env(Self::ENV_WARMING_BATCH_SIZE)? {
            config.warming.batch_size = v as usize;
        }
        if let Some(v) = Self::parse_u64_env(Self::ENV_MIGRATION_BATCH_SIZE)? {
            config.migration.batch_size = v as usize;
        }
        if let Some(v) = Self::parse_u64_env(Self::ENV_MIGRATION_MAX_RETRIES)? {
            config.migration.max_retries = v as u32;
        }
        if let Some(v) = Self::parse_u64_env(Self::ENV_MIGRATION_TIMEOUT_SECONDS)? {
            config.migration.timeout = Duration::from_secs(v);
        }
        if let Some(v) = Self::parse_u64_env(Self::ENV_ANALYTICS_SNAPSHOT_SECONDS)? {
            config.analytics.snapshot_interval = Duration::from_secs(v);
        }
        if let Some(v) = Self::parse_u64_env(Self::ENV_COMPAT_CACHE_TTL_HOURS)? {
            config.compat.cache_ttl_hours = v as i64;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field invariants not expressible in individual defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ceiling == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_CACHE_CEILING,
                reason: "must be > 0".to_string(),
            });
        }
        if self.warming.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_WARMING_BATCH_SIZE,
                reason: "must be > 0".to_string(),
            });
        }
        if self.migration.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_MIGRATION_BATCH_SIZE,
                reason: "must be > 0".to_string(),
            });
        }
        self.dedup.thresholds.validate().map_err(|reason| ConfigError::InvalidValue {
            name: "ECCMS_DEDUP_THRESHOLDS",
            reason,
        })?;
        Ok(())
    }

    fn parse_u64_env(name: &'static str) -> Result<Option<u64>, ConfigError> {
        match env::var(name) {
            Ok(value) => {
                let parsed = value
                    .parse::<u64>()
                    .map_err(|source| ConfigError::ParseError { name, value, source })?;
                Ok(Some(parsed))
            }
            Err(_) => Ok(None),
        }
    }
}
