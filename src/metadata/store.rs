//! Collection metadata storage.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::error::MetadataError;
use super::types::{CollectionMetadata, CollectionStatus, ConfigHistoryEntry, EmbeddingConfig};

/// Storage seam for per-tenant collection metadata. Owned by the relational store in
/// production; `InMemoryMetadataStore` is the default deployable/test implementation.
pub struct MetadataStore {
    rows: RwLock<HashMap<String, CollectionMetadata>>,
}

impl Default for MetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Creates or replaces the current configuration/point-count/status for `tenant`,
    /// without touching history. Used for out-of-band corrections (e.g. reconciling
    /// point count); configuration *changes* should go through [`Self::record_change`].
    pub fn upsert(
        &self,
        tenant: &str,
        provider: &str,
        model: &str,
        dimension: u64,
        point_count: u64,
        status: CollectionStatus,
    ) {
        let mut guard = self.rows.write();
        let row = guard
            .entry(tenant.to_string())
            .or_insert_with(|| CollectionMetadata::new(tenant, EmbeddingConfig::new(provider, model, dimension), point_count));
        row.current = EmbeddingConfig::new(provider, model, dimension);
        row.point_count = point_count;
        row.status = status;
    }

    /// Returns the metadata row for a tenant.
    pub fn get(&self, tenant: &str) -> Result<CollectionMetadata, MetadataError> {
        self.rows
            .read()
            .get(tenant)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound {
                tenant: tenant.to_string(),
            })
    }

    /// Returns the most recent `limit` history entries, newest first.
    pub fn history(&self, tenant: &str, limit: usize) -> Result<Vec<ConfigHistoryEntry>, MetadataError> {
        let row = self.get(tenant)?;
        Ok(row.history.iter().rev().take(limit).cloned().collect())
    }

    /// Appends a configuration-change history entry and, if `previous` is supplied,
    /// leaves the tenant's `current` configuration untouched until the caller later
    /// calls [`Self::complete_migration`] or a follow-up [`Self::upsert`] — history
    /// is emitted *before* the state transition that might fail.
    pub fn record_change(
        &self,
        tenant: &str,
        previous: Option<EmbeddingConfig>,
        new: EmbeddingConfig,
        reason: &str,
        actor: &str,
        migration_required: bool,
        migration_id: Option<String>,
    ) {
        let mut guard = self.rows.write();
        let row = guard
            .entry(tenant.to_string())
            .or_insert_with(|| CollectionMetadata::new(tenant, new.clone(), 0));

        row.history.push(ConfigHistoryEntry {
            previous,
            new: new.clone(),
            reason: reason.to_string(),
            migration_required,
            migration_completed: !migration_required,
            migration_id: migration_id.clone(),
            actor: actor.to_string(),
            timestamp: Utc::now(),
        });
        if migration_id.is_some() {
            row.last_migration = migration_id;
        }
        if !migration_required {
            row.current = new;
        }
    }

    /// Marks the most recent history entry for `migration_id` as completed and applies
    /// its `new` configuration as the tenant's current one.
    pub fn complete_migration(
        &self,
        tenant: &str,
        migration_id: &str,
        final_point_count: u64,
    ) -> Result<(), MetadataError> {
        let mut guard = self.rows.write();
        let row = guard.get_mut(tenant).ok_or_else(|| MetadataError::NotFound {
            tenant: tenant.to_string(),
        })?;

        let entry = row
            .history
            .iter_mut()
            .rev()
            .find(|e| e.migration_id.as_deref() == Some(migration_id))
            .ok_or_else(|| MetadataError::HistoryEntryNotFound {
                tenant: tenant.to_string(),
                migration_id: migration_id.to_string(),
            })?;

        entry.migration_completed = true;
        row.current = entry.new.clone();
        row.point_count = final_point_count;
        row.status = CollectionStatus::Active;
        Ok(())
    }

    /// Restores a tenant's current configuration to `config` (used by migration
    /// rollback) without mutating history.
    pub fn restore_current(&self, tenant: &str, config: EmbeddingConfig, point_count: u64) -> Result<(), MetadataError> {
        let mut guard = self.rows.write();
        let row = guard.get_mut(tenant).ok_or_else(|| MetadataError::NotFound {
            tenant: tenant.to_string(),
        })?;
        row.current = config;
        row.point_count = point_count;
        row.status = CollectionStatus::Active;
        Ok(())
    }

    /// Marks a tenant's collection as `migrating`.
    pub fn mark_migrating(&self, tenant: &str) -> Result<(), MetadataError> {
        let mut guard = self.rows.write();
        let row = guard.get_mut(tenant).ok_or_else(|| MetadataError::NotFound {
            tenant: tenant.to_string(),
        })?;
        row.status = CollectionStatus::Migrating;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_change_without_migration_applies_immediately() {
        let store = MetadataStore::new();
        store.upsert("t1", "A", "M1", 768, 10, CollectionStatus::Active);
        store.record_change(
            "t1",
            Some(EmbeddingConfig::new("A", "M1", 768)),
            EmbeddingConfig::new("A", "M1b", 768),
            "model alias update",
            "admin",
            false,
            None,
        );
        let row = store.get("t1").unwrap();
        assert_eq!(row.current.model, "M1b");
        assert!(row.history[0].migration_completed);
    }

    #[test]
    fn record_change_with_migration_defers_current_until_complete() {
        let store = MetadataStore::new();
        store.upsert("t1", "A", "M1", 768, 10, CollectionStatus::Active);
        store.record_change(
            "t1",
            Some(EmbeddingConfig::new("A", "M1", 768)),
            EmbeddingConfig::new("B", "M2", 1024),
            "dimension change",
            "admin",
            true,
            Some("mig-1".to_string()),
        );

        let row = store.get("t1").unwrap();
        assert_eq!(row.current.provider, "A");
        assert!(!row.history[0].migration_completed);

        store.complete_migration("t1", "mig-1", 150).unwrap();
        let row = store.get("t1").unwrap();
        assert_eq!(row.current.provider, "B");
        assert_eq!(row.current.dimension, 1024);
        assert!(row.history[0].migration_completed);
    }

    #[test]
    fn history_is_newest_first_and_limited() {
        let store = MetadataStore::new();
        store.upsert("t1", "A", "M1", 768, 0, CollectionStatus::Active);
        for i in 0..3 {
            store.record_change(
                "t1",
                None,
                EmbeddingConfig::new("A", format!("M{i}"), 768),
                "test",
                "admin",
                false,
                None,
            );
        }
        let history = store.history("t1", 2).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].new.model, "M2");
    }
}
