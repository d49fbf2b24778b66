//! Collection metadata data model: per-tenant descriptors and configuration history.

use chrono::{DateTime, Utc};

/// Lifecycle status of a tenant's collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// Serving normally.
    Active,
    /// A migration is in progress; reads/writes to the canonical collection continue
    /// unaffected until finalization.
    Migrating,
    /// Superseded; retained for audit purposes only.
    Deprecated,
}

/// An embedding (provider, model, dimension) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingConfig {
    /// Provider tag.
    pub provider: String,
    /// Model tag.
    pub model: String,
    /// Discovered output dimension.
    pub dimension: u64,
}

impl EmbeddingConfig {
    /// Builds a config triple.
    pub fn new(provider: impl Into<String>, model: impl Into<String>, dimension: u64) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            dimension,
        }
    }
}

/// An immutable configuration-change record.
#[derive(Debug, Clone)]
pub struct ConfigHistoryEntry {
    /// The configuration before this change, if one existed.
    pub previous: Option<EmbeddingConfig>,
    /// The configuration after this change.
    pub new: EmbeddingConfig,
    /// Why the change was made.
    pub reason: String,
    /// Whether a migration was required to realize this change.
    pub migration_required: bool,
    /// Flips to `true` only when the corresponding migration terminates successfully.
    pub migration_completed: bool,
    /// The migration id, if one was required.
    pub migration_id: Option<String>,
    /// Who initiated the change.
    pub actor: String,
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Per-tenant collection descriptor; exactly one exists per tenant.
#[derive(Debug, Clone)]
pub struct CollectionMetadata {
    /// Canonical collection key (the tenant id).
    pub collection_key: String,
    /// Current embedding configuration.
    pub current: EmbeddingConfig,
    /// Current point count.
    pub point_count: u64,
    /// Current lifecycle status.
    pub status: CollectionStatus,
    /// Append-only configuration history.
    pub history: Vec<ConfigHistoryEntry>,
    /// The most recent migration id touching this tenant, if any.
    pub last_migration: Option<String>,
}

impl CollectionMetadata {
    /// Builds a fresh metadata row with no history.
    pub fn new(tenant: &str, config: EmbeddingConfig, point_count: u64) -> Self {
        Self {
            collection_key: tenant.to_string(),
            current: config,
            point_count,
            status: CollectionStatus::Active,
            history: Vec::new(),
            last_migration: None,
        }
    }
}
