//! Policy layer over [`super::engine::DedupEngine`]: enforces the `enabled` flag, wires
//! detection into storage, and records every decision to the audit trail.

use std::sync::Arc;

use serde_json::json;

use crate::audit::store::{AuditStore, AuditTrail};
use crate::audit::types::AuditAction;
use crate::collection::{CollectionClient, canonical_key, point_id_for_chunk};
use crate::config::DedupConfig;

use super::engine::DedupEngine;
use super::error::DedupError;
use super::store::ChunkStore;
use super::types::{ConflictCase, DedupAction, DeduplicationResult, ManualResolution};

/// Coordinates chunk storage, the similarity engine, the tenant's vector collection,
/// and the audit trail behind the tenant-facing dedup policy.
pub struct DedupManager<C: ChunkStore, Coll: CollectionClient, A: AuditStore> {
    config: DedupConfig,
    store: C,
    collection: Arc<Coll>,
    audit: AuditTrail<A>,
    conflicts: parking_lot::RwLock<Vec<ConflictCase>>,
}

impl<C: ChunkStore, Coll: CollectionClient, A: AuditStore> DedupManager<C, Coll, A> {
    /// Builds a manager from a chunk store, a vector collection client, an audit
    /// store, and policy config.
    pub fn new(config: DedupConfig, store: C, collection: Arc<Coll>, audit: AuditTrail<A>) -> Self {
        Self {
            config,
            store,
            collection,
            audit,
            conflicts: parking_lot::RwLock::new(Vec::new()),
        }
    }

    /// Deletes the vectors belonging to `chunk_ids` from the tenant's collection. A
    /// merge or manual resolution that removes chunks from the relational store must
    /// remove their vectors too, or the collection accumulates orphans no chunk ever
    /// references again.
    async fn delete_vectors(&self, tenant: &str, chunk_ids: &[String]) -> Result<(), DedupError> {
        if chunk_ids.is_empty() {
            return Ok(());
        }
        let ids: Vec<u64> = chunk_ids.iter().map(|id| point_id_for_chunk(id)).collect();
        self.collection
            .delete_points(&canonical_key(tenant), &ids)
            .await
            .map_err(|e| DedupError::Storage(e.to_string()))
    }

    fn engine(&self) -> DedupEngine {
        DedupEngine::new(self.config.thresholds, self.config.strategy)
    }

    /// Runs detection and merge decisioning over every chunk in `document_id`, applying
    /// merges to the chunk store and recording an audit record per decision. Returns
    /// `Err(Disabled)` unless `force` is set when policy has `enabled = false`.
    pub async fn deduplicate_document(
        &self,
        tenant: &str,
        document_id: &str,
        force: bool,
    ) -> Result<DeduplicationResult, DedupError> {
        if !self.config.enabled && !force {
            return Err(DedupError::Disabled);
        }

        let chunks = self.store.list_for_document(tenant, document_id).await?;
        let result = self
            .engine()
            .deduplicate(tenant, &chunks, self.config.cross_document_allowed);

        for decision in &result.decisions {
            self.store
                .update_metadata(tenant, &decision.primary_chunk_id, decision.merged_metadata.clone())
                .await?;
        }
        if !result.deleted_chunk_ids.is_empty() {
            self.store.delete_many(tenant, &result.deleted_chunk_ids).await?;
            self.delete_vectors(tenant, &result.deleted_chunk_ids).await?;
        }

        if !result.decisions.is_empty() {
            let details = result
                .decisions
                .iter()
                .map(|d| serde_json::to_value(d).unwrap_or(json!({})))
                .collect();
            self.audit
                .record_batch(tenant, AuditAction::DedupMerge, Some("system".to_string()), details)
                .await
                .map_err(|e| DedupError::Storage(e.to_string()))?;
        }

        if !result.conflicts.is_empty() {
            self.conflicts.write().extend(result.conflicts.iter().cloned());
        }

        Ok(result)
    }

    /// Lists unresolved conflict cases for a tenant.
    pub fn open_conflicts(&self, tenant: &str) -> Vec<ConflictCase> {
        self.conflicts
            .read()
            .iter()
            .filter(|c| c.tenant == tenant && !c.resolved)
            .cloned()
            .collect()
    }

    /// Applies a manual resolution to a conflict case, mutating chunk storage and
    /// recording the resolution to the audit trail.
    pub async fn resolve_conflict(
        &self,
        case_id: &str,
        resolution: ManualResolution,
        resolver: &str,
    ) -> Result<(), DedupError> {
        let mut guard = self.conflicts.write();
        let case = guard
            .iter_mut()
            .find(|c| c.case_id == case_id)
            .ok_or_else(|| DedupError::CaseNotFound {
                case_id: case_id.to_string(),
            })?;

        if case.resolved {
            return Err(DedupError::TransactionFailed {
                reason: format!("conflict case {case_id} already resolved"),
            });
        }

        let tenant = case.tenant.clone();
        let chunk_ids = case.chunk_ids.clone();

        match resolution {
            ManualResolution::Preserve => {}
            ManualResolution::RemoveFirst => {
                if let Some(id) = chunk_ids.first() {
                    let removed = std::slice::from_ref(id);
                    self.store.delete_many(&tenant, removed).await?;
                    self.delete_vectors(&tenant, removed).await?;
                }
            }
            ManualResolution::RemoveSecond => {
                if let Some(id) = chunk_ids.get(1) {
                    let removed = std::slice::from_ref(id);
                    self.store.delete_many(&tenant, removed).await?;
                    self.delete_vectors(&tenant, removed).await?;
                }
            }
            ManualResolution::Merge => {
                let chunks = self.store.list(&tenant, Some(&chunk_ids)).await?;
                if let Some(primary) = chunks.first() {
                    let duplicates: Vec<String> =
                        chunks.iter().skip(1).map(|c| c.chunk_id.clone()).collect();
                    self.store.delete_many(&tenant, &duplicates).await?;
                    self.delete_vectors(&tenant, &duplicates).await?;
                    let _ = primary;
                }
            }
        }

        case.resolved = true;
        case.resolver = Some(resolver.to_string());
        case.resolved_at = Some(chrono::Utc::now());
        case.resolution_action = Some(resolution);

        let detail = json!({
            "case_id": case_id,
            "chunk_ids": chunk_ids,
            "resolution": format!("{resolution:?}"),
        });
        drop(guard);

        self.audit
            .record_decision(&tenant, AuditAction::ConflictResolve, Some(resolver.to_string()), detail)
            .await
            .map_err(|e| DedupError::Storage(e.to_string()))?;

        Ok(())
    }
}

/// `Preserve` is a no-op decision (used when a conflict is resolved by leaving both
/// chunks intact); it exists so callers can audit that choice uniformly with `Merge`.
pub fn preserve_action() -> DedupAction {
    DedupAction::Preserve
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use std::collections::BTreeMap;

    use crate::audit::store::InMemoryAuditStore;
    use crate::collection::MockCollectionClient;
    use crate::dedup::store::InMemoryChunkStore;
    use crate::dedup::types::DocumentChunk;

    use super::*;

    fn chunk(id: &str, doc: &str, content: &str) -> DocumentChunk {
        DocumentChunk {
            chunk_id: id.to_string(),
            tenant: "t1".to_string(),
            document_id: doc.to_string(),
            chunk_index: 0,
            content: content.to_string(),
            vector_id: None,
            metadata: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    async fn manager(config: DedupConfig) -> DedupManager<InMemoryChunkStore, MockCollectionClient, InMemoryAuditStore> {
        let collection = MockCollectionClient::new();
        collection.create_collection("t1", 4).await.unwrap();
        DedupManager::new(
            config,
            InMemoryChunkStore::new(),
            Arc::new(collection),
            AuditTrail::new(InMemoryAuditStore::new()),
        )
    }

    #[tokio::test]
    async fn disabled_without_force_is_rejected() {
        let mgr = manager(DedupConfig {
            enabled: false,
            ..Default::default()
        })
        .await;
        let result = mgr.deduplicate_document("t1", "d1", false).await;
        assert!(matches!(result, Err(DedupError::Disabled)));
    }

    #[tokio::test]
    async fn disabled_with_force_proceeds() {
        let mgr = manager(DedupConfig {
            enabled: false,
            ..Default::default()
        })
        .await;
        let result = mgr.deduplicate_document("t1", "d1", true).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn merge_records_audit_and_deletes_duplicates() {
        let mgr = manager(DedupConfig::default()).await;
        mgr.store.seed(vec![
            chunk("c1", "d1", "the quick brown fox jumps over the lazy dog"),
            chunk("c2", "d1", "the quick brown fox jumps over the lazy dog"),
        ]);
        for id in ["c1", "c2"] {
            mgr.collection
                .upsert_points(
                    "t1",
                    vec![crate::collection::VectorPoint::new(crate::collection::point_id_for_chunk(id), vec![0.0; 4], id)],
                )
                .await
                .unwrap();
        }

        let result = mgr.deduplicate_document("t1", "d1", false).await.unwrap();
        assert_eq!(result.decisions.len(), 1);
        assert_eq!(result.deleted_chunk_ids, vec!["c2".to_string()]);

        let remaining = mgr.store.list("t1", None).await.unwrap();
        assert_eq!(remaining.len(), 1);

        let stats = mgr.audit.stats("t1", 1).await.unwrap();
        assert_eq!(stats.total, 1);

        // The duplicate's vector must be gone from the collection too, not just the
        // relational store.
        let points = mgr.collection.list_points("t1").await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].chunk_id, "c1");
    }

    #[tokio::test]
    async fn manual_strategy_creates_resolvable_conflicts() {
        let mgr = manager(DedupConfig {
            strategy: crate::dedup::types::DedupStrategy::Manual,
            ..Default::default()
        })
        .await;
        mgr.store.seed(vec![
            chunk("c1", "d1", "the quick brown fox jumps over the lazy dog"),
            chunk("c2", "d1", "the quick brown fox jumps over the lazy dog"),
        ]);

        let result = mgr.deduplicate_document("t1", "d1", false).await.unwrap();
        assert!(result.decisions.is_empty());
        assert_eq!(result.conflicts.len(), 1);

        let open = mgr.open_conflicts("t1");
        assert_eq!(open.len(), 1);

        mgr.resolve_conflict(&open[0].case_id, ManualResolution::Preserve, "alice")
            .await
            .unwrap();
        assert!(mgr.open_conflicts("t1").is_empty());
    }

    #[tokio::test]
    async fn remove_first_resolution_deletes_the_vector_too() {
        let mgr = manager(DedupConfig {
            strategy: crate::dedup::types::DedupStrategy::Manual,
            ..Default::default()
        })
        .await;
        mgr.store.seed(vec![
            chunk("c1", "d1", "the quick brown fox jumps over the lazy dog"),
            chunk("c2", "d1", "the quick brown fox jumps over the lazy dog"),
        ]);
        for id in ["c1", "c2"] {
            mgr.collection
                .upsert_points(
                    "t1",
                    vec![crate::collection::VectorPoint::new(crate::collection::point_id_for_chunk(id), vec![0.0; 4], id)],
                )
                .await
                .unwrap();
        }

        mgr.deduplicate_document("t1", "d1", false).await.unwrap();
        let open = mgr.open_conflicts("t1");
        let case_id = open[0].case_id.clone();
        let kept_id = open[0].chunk_ids[1].clone();

        mgr.resolve_conflict(&case_id, ManualResolution::RemoveFirst, "alice")
            .await
            .unwrap();

        let points = mgr.collection.list_points("t1").await.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].chunk_id, kept_id);
    }
}
