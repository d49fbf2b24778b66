//! Phased migration state machine.
//!
//! The happy path walks validation → backup → new collection → data migration →
//! [verification] → finalization → cleanup. Every phase after validation is recorded
//! against [`super::types::MigrationProgress`]; a failure at any point triggers rollback
//! unless the tenant's migration config disables it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditStore, AuditTrail};
use crate::collection::{self, CollectionClient, VectorPoint};
use crate::config::MigrationConfig;
use crate::constants::MIGRATION_FAILURE_RATIO_STOP;
use crate::dedup::ChunkStore;
use crate::metadata::{EmbeddingConfig, MetadataStore};
use crate::provider::{Credential, ProviderRegistry};

use super::error::MigrationError;
use super::estimate::estimate;
use super::types::{MigrationPhase, MigrationProgress, MigrationStatus, RollbackInfo};

struct EngineState {
    active_by_tenant: HashMap<String, String>,
    progress: HashMap<String, MigrationProgress>,
    rollback: HashMap<String, RollbackInfo>,
    cancel_flags: HashMap<String, Arc<AtomicBool>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            active_by_tenant: HashMap::new(),
            progress: HashMap::new(),
            rollback: HashMap::new(),
            cancel_flags: HashMap::new(),
        }
    }

    fn sweep_expired(&mut self) {
        let now = chrono::Utc::now();
        let retention = chrono::Duration::seconds(crate::constants::MIGRATION_PROGRESS_RETENTION.as_secs() as i64);
        let expired: Vec<String> = self
            .progress
            .iter()
            .filter(|(_, p)| p.terminal_at.is_some_and(|t| now - t > retention))
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            self.progress.remove(&id);
            self.rollback.remove(&id);
            self.cancel_flags.remove(&id);
        }
    }
}

/// Orchestrates tenant re-embedding migrations end to end.
///
/// Generic over the chunk store, collection client, and audit store so tests run
/// entirely against in-memory/mock backends, via a trait seam at every external
/// collaborator.
pub struct MigrationEngine<C: ChunkStore, Coll: CollectionClient, A: AuditStore> {
    config: MigrationConfig,
    chunk_store: Arc<C>,
    collection_client: Arc<Coll>,
    metadata: Arc<MetadataStore>,
    audit: Arc<AuditTrail<A>>,
    registry: ProviderRegistry,
    state: RwLock<EngineState>,
}

impl<C, Coll, A> MigrationEngine<C, Coll, A>
where
    C: ChunkStore + 'static,
    Coll: CollectionClient + 'static,
    A: AuditStore + 'static,
{
    /// Builds an engine over its collaborators.
    pub fn new(
        config: MigrationConfig,
        chunk_store: Arc<C>,
        collection_client: Arc<Coll>,
        metadata: Arc<MetadataStore>,
        audit: Arc<AuditTrail<A>>,
        registry: ProviderRegistry,
    ) -> Self {
        Self {
            config,
            chunk_store,
            collection_client,
            metadata,
            audit,
            registry,
            state: RwLock::new(EngineState::new()),
        }
    }

    /// Starts a migration to `(new_provider, new_model)` for `tenant`. Enforces at most
    /// one active migration per tenant and a global concurrency cap, then runs the
    /// phase pipeline in the background and returns immediately with the initial
    /// progress snapshot.
    pub async fn start_migration(
        self: &Arc<Self>,
        tenant: &str,
        new_provider: &str,
        new_model: &str,
        credential: Option<Credential>,
    ) -> Result<MigrationProgress, MigrationError> {
        self.metadata.get(tenant).map_err(|e| MigrationError::ValidationFailed { reason: e.to_string() })?;

        let migration_id = Uuid::new_v4().to_string();
        let progress = MigrationProgress::new(&migration_id, tenant, self.config.enable_rollback);

        {
            let mut state = self.state.write();
            state.sweep_expired();
            if let Some(existing) = state.active_by_tenant.get(tenant) {
                return Err(MigrationError::AlreadyActive {
                    tenant: tenant.to_string(),
                    migration_id: existing.clone(),
                });
            }
            if state.active_by_tenant.len() >= self.config.max_concurrent {
                return Err(MigrationError::ConcurrencyCapReached {
                    cap: self.config.max_concurrent,
                });
            }
            state.active_by_tenant.insert(tenant.to_string(), migration_id.clone());
            state.cancel_flags.insert(migration_id.clone(), Arc::new(AtomicBool::new(false)));
            state.progress.insert(migration_id.clone(), progress.clone());
        }

        self.audit
            .record_decision(
                tenant,
                AuditAction::MigrationStart,
                Some("migration_engine".to_string()),
                serde_json::json!({"migration_id": migration_id, "new_provider": new_provider, "new_model": new_model}),
            )
            .await
            .ok();

        let engine = Arc::clone(self);
        let tenant = tenant.to_string();
        let new_provider = new_provider.to_string();
        let new_model = new_model.to_string();
        tokio::spawn(async move {
            engine.run(migration_id, tenant, new_provider, new_model, credential).await;
        });

        Ok(progress)
    }

    /// Returns the current progress for a migration, sweeping expired terminal
    /// entries first.
    pub fn progress(&self, migration_id: &str) -> Result<MigrationProgress, MigrationError> {
        let mut state = self.state.write();
        state.sweep_expired();
        state
            .progress
            .get(migration_id)
            .cloned()
            .ok_or_else(|| MigrationError::NotFound {
                migration_id: migration_id.to_string(),
            })
    }

    /// Returns the active (non-terminal) migration for a tenant, if any.
    pub fn active_for_tenant(&self, tenant: &str) -> Option<MigrationProgress> {
        let mut state = self.state.write();
        state.sweep_expired();
        let id = state.active_by_tenant.get(tenant)?.clone();
        state.progress.get(&id).cloned()
    }

    /// Requests cancellation of a running migration. The phase runner checks this flag
    /// between batches and at phase boundaries; cancellation is cooperative, not
    /// immediate.
    pub fn cancel(&self, migration_id: &str) -> Result<(), MigrationError> {
        let state = self.state.read();
        let flag = state
            .cancel_flags
            .get(migration_id)
            .ok_or_else(|| MigrationError::NotFound {
                migration_id: migration_id.to_string(),
            })?;
        flag.store(true, Ordering::Release);
        Ok(())
    }

    fn update_progress(&self, migration_id: &str, f: impl FnOnce(&mut MigrationProgress)) {
        let mut state = self.state.write();
        if let Some(progress) = state.progress.get_mut(migration_id) {
            f(progress);
            progress.last_update = chrono::Utc::now();
        }
    }

    fn is_cancelled(&self, migration_id: &str) -> bool {
        self.state
            .read()
            .cancel_flags
            .get(migration_id)
            .is_some_and(|f| f.load(Ordering::Acquire))
    }

    fn release_active_slot(&self, tenant: &str, migration_id: &str) {
        let mut state = self.state.write();
        if state.active_by_tenant.get(tenant).map(|s| s.as_str()) == Some(migration_id) {
            state.active_by_tenant.remove(tenant);
        }
    }

    async fn run(
        self: Arc<Self>,
        migration_id: String,
        tenant: String,
        new_provider: String,
        new_model: String,
        credential: Option<Credential>,
    ) {
        let outcome = match tokio::time::timeout(
            self.config.timeout,
            self.run_phases(&migration_id, &tenant, &new_provider, &new_model, credential.as_ref()),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(RunFailure::Fatal(format!(
                "migration exceeded its {:?} wall-clock timeout",
                self.config.timeout
            ))),
        };

        match outcome {
            Ok(()) => {
                self.update_progress(&migration_id, |p| p.finish(MigrationStatus::Completed, None));
                self.release_active_slot(&tenant, &migration_id);
                self.audit
                    .record_decision(
                        &tenant,
                        AuditAction::MigrationEnd,
                        Some("migration_engine".to_string()),
                        serde_json::json!({"status": "completed", "migration_id": migration_id}),
                    )
                    .await
                    .ok();
            }
            // `rollback` already finishes progress, releases the tenant's active slot,
            // and records the MigrationEnd audit entry for both of these outcomes.
            Err(RunFailure::Cancelled) => self.rollback(&migration_id, &tenant, true).await,
            Err(RunFailure::Fatal(reason)) => {
                self.update_progress(&migration_id, |p| p.error = Some(reason));
                self.rollback(&migration_id, &tenant, false).await;
            }
        }
    }

    async fn run_phases(
        &self,
        migration_id: &str,
        tenant: &str,
        new_provider: &str,
        new_model: &str,
        credential: Option<&Credential>,
    ) -> Result<(), RunFailure> {
        // --- Validation ---
        self.update_progress(migration_id, |p| {
            p.status = MigrationStatus::Preparing;
            p.phase = MigrationPhase::Validation;
        });

        let adapter = self
            .registry
            .get(new_provider)
            .map_err(|e| RunFailure::Fatal(e.to_string()))?;
        let new_dimension = adapter
            .dimension(new_model)
            .await
            .map_err(|e| RunFailure::Fatal(e.to_string()))?;
        if let Some(credential) = credential {
            adapter
                .validate_credential(credential)
                .await
                .map_err(|e| RunFailure::Fatal(e.to_string()))?;
        }
        let current = self
            .metadata
            .get(tenant)
            .map_err(|e| RunFailure::Fatal(e.to_string()))?;

        if current.current.provider == new_provider
            && current.current.model == new_model
            && current.current.dimension == new_dimension
        {
            return Ok(());
        }

        if self.is_cancelled(migration_id) {
            return Err(RunFailure::Cancelled);
        }

        self.metadata.mark_migrating(tenant).map_err(|e| RunFailure::Fatal(e.to_string()))?;
        let new_config = EmbeddingConfig::new(new_provider, new_model, new_dimension);
        self.metadata.record_change(
            tenant,
            Some(current.current.clone()),
            new_config.clone(),
            "provider/model migration",
            "migration_engine",
            true,
            Some(migration_id.to_string()),
        );

        // --- Backup ---
        self.update_progress(migration_id, |p| p.phase = MigrationPhase::Backup);
        let epoch = chrono::Utc::now().timestamp();
        let original_key = collection::canonical_key(tenant);
        let backup_key = collection::temp_key("backup", tenant, epoch);
        let new_key = collection::temp_key("new", tenant, epoch);

        if self.config.enable_rollback {
            self.state.write().rollback.insert(
                migration_id.to_string(),
                RollbackInfo {
                    migration_id: migration_id.to_string(),
                    tenant: tenant.to_string(),
                    original_config: current.current.clone(),
                    original_collection_key: original_key.clone(),
                    backup_collection_key: backup_key.clone(),
                    new_collection_key: new_key.clone(),
                    backup_created: true,
                    migrated_chunk_ids: Vec::new(),
                    created_at: chrono::Utc::now(),
                },
            );
        }

        // --- New collection ---
        self.update_progress(migration_id, |p| p.phase = MigrationPhase::NewCollection);
        self.collection_client
            .ensure_collection(&new_key, new_dimension)
            .await
            .map_err(|e| RunFailure::Fatal(e.to_string()))?;

        // --- Data migration ---
        self.update_progress(migration_id, |p| {
            p.phase = MigrationPhase::DataMigration;
            p.status = MigrationStatus::InProgress;
        });
        let chunks = self
            .chunk_store
            .list(tenant, None)
            .await
            .map_err(|e| RunFailure::Fatal(e.to_string()))?;

        let total = chunks.len() as u64;
        let batch_size = self.config.batch_size.max(1);
        let total_batches = total.div_ceil(batch_size as u64);
        self.update_progress(migration_id, |p| {
            p.total_chunks = total;
            p.total_batches = total_batches;
        });

        let mut processed: u64 = 0;
        let mut failed: u64 = 0;
        let mut migrated_ids = Vec::new();

        for (batch_index, batch) in chunks.chunks(batch_size).enumerate() {
            if self.is_cancelled(migration_id) {
                return Err(RunFailure::Cancelled);
            }

            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embedded = self.embed_with_retry(&adapter, &texts, new_model, credential).await;

            match embedded {
                Ok(vectors) => {
                    let points: Vec<VectorPoint> = batch
                        .iter()
                        .zip(vectors.into_iter())
                        .map(|(chunk, vector)| {
                            VectorPoint::new(collection::point_id_for_chunk(&chunk.chunk_id), vector, chunk.chunk_id.clone())
                                .with_metadata(chunk.metadata.clone())
                        })
                        .collect();
                    self.collection_client
                        .upsert_points(&new_key, points)
                        .await
                        .map_err(|e| RunFailure::Fatal(e.to_string()))?;
                    processed += batch.len() as u64;
                    migrated_ids.extend(batch.iter().map(|c| c.chunk_id.clone()));
                }
                Err(reason) => {
                    failed += batch.len() as u64;
                    self.update_progress(migration_id, |p| p.error = Some(reason));
                }
            }

            let remaining = total.saturating_sub(processed + failed);
            let remaining_estimate = estimate(remaining, batch_size as u64);
            self.update_progress(migration_id, |p| {
                p.processed_chunks = processed;
                p.failed_chunks = failed;
                p.current_batch = batch_index as u64 + 1;
                p.estimated_completion =
                    Some(chrono::Utc::now() + chrono::Duration::milliseconds((remaining_estimate.seconds * 1000.0) as i64));
            });

            if let Some(rollback) = self.state.write().rollback.get_mut(migration_id) {
                rollback.migrated_chunk_ids = migrated_ids.clone();
            }

            let attempted = processed + failed;
            if attempted > 0 && (failed as f64 / attempted as f64) > MIGRATION_FAILURE_RATIO_STOP {
                return Err(RunFailure::Fatal(format!(
                    "failure ratio {:.2} exceeded the {:.2} stop threshold after {attempted} chunks",
                    failed as f64 / attempted as f64,
                    MIGRATION_FAILURE_RATIO_STOP
                )));
            }
        }

        // --- Verification ---
        if self.config.verify {
            self.update_progress(migration_id, |p| {
                p.phase = MigrationPhase::Verification;
                p.status = MigrationStatus::Completing;
            });
            let observed_dimension = self
                .collection_client
                .dimension(&new_key)
                .await
                .map_err(|e| RunFailure::Fatal(e.to_string()))?;
            if observed_dimension != Some(new_dimension) {
                return Err(RunFailure::Fatal(format!(
                    "verification failed: expected dimension {new_dimension}, found {observed_dimension:?}"
                )));
            }
            let observed_count = self
                .collection_client
                .point_count(&new_key)
                .await
                .map_err(|e| RunFailure::Fatal(e.to_string()))?;
            if observed_count != processed {
                return Err(RunFailure::Fatal(format!(
                    "verification failed: expected {processed} points, found {observed_count}"
                )));
            }
        }

        // --- Finalization ---
        self.update_progress(migration_id, |p| {
            p.phase = MigrationPhase::Finalization;
            p.status = MigrationStatus::Completing;
        });
        self.collection_client
            .delete_collection(&original_key)
            .await
            .map_err(|e| RunFailure::Fatal(e.to_string()))?;
        self.collection_client
            .create_collection(&original_key, new_dimension)
            .await
            .map_err(|e| RunFailure::Fatal(e.to_string()))?;
        let points = self
            .collection_client
            .list_points(&new_key)
            .await
            .map_err(|e| RunFailure::Fatal(e.to_string()))?;
        self.collection_client
            .upsert_points(&original_key, points)
            .await
            .map_err(|e| RunFailure::Fatal(e.to_string()))?;
        self.metadata
            .complete_migration(tenant, migration_id, processed)
            .map_err(|e| RunFailure::Fatal(e.to_string()))?;

        // --- Cleanup ---
        self.update_progress(migration_id, |p| p.phase = MigrationPhase::Cleanup);
        self.collection_client.delete_collection(&new_key).await.ok();
        if self.config.enable_rollback {
            self.collection_client.delete_collection(&backup_key).await.ok();
        }

        Ok(())
    }

    async fn embed_with_retry(
        &self,
        adapter: &Arc<dyn crate::provider::EmbeddingProvider>,
        texts: &[String],
        model: &str,
        credential: Option<&Credential>,
    ) -> Result<Vec<Vec<f32>>, String> {
        let mut attempt = 0u32;
        let mut backoff = self.config.retry_backoff;
        loop {
            match adapter.embed(texts, model, credential).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e.to_string()),
            }
        }
    }

    async fn rollback(&self, migration_id: &str, tenant: &str, cancelled: bool) {
        self.update_progress(migration_id, |p| p.status = MigrationStatus::RollingBack);

        let rollback_info = self.state.read().rollback.get(migration_id).cloned();
        let mut rollback_ok = true;

        if let Some(info) = &rollback_info {
            if let Ok(exists) = self.collection_client.collection_exists(&info.original_collection_key).await {
                if !exists {
                    rollback_ok = self
                        .collection_client
                        .create_collection(&info.original_collection_key, info.original_config.dimension)
                        .await
                        .is_ok();
                }
            } else {
                rollback_ok = false;
            }

            let point_count = self
                .metadata
                .get(tenant)
                .map(|row| row.point_count)
                .unwrap_or(0);
            if self
                .metadata
                .restore_current(tenant, info.original_config.clone(), point_count)
                .is_err()
            {
                rollback_ok = false;
            }

            self.collection_client.delete_collection(&info.backup_collection_key).await.ok();
            self.collection_client.delete_collection(&info.new_collection_key).await.ok();
        }
        // else: rollback was disabled for this migration; there is nothing to restore,
        // and `rollback_ok` stays `true` so cancellation/failure still reaches its
        // terminal status instead of being reported as a failed rollback.

        let final_status = if cancelled {
            MigrationStatus::Cancelled
        } else if rollback_info.is_some() {
            if rollback_ok { MigrationStatus::RolledBack } else { MigrationStatus::Failed }
        } else {
            // Validation failed before any tenant state changed; there is nothing to
            // roll back, so the migration simply failed.
            MigrationStatus::Failed
        };

        self.update_progress(migration_id, |p| p.finish(final_status, None));
        self.release_active_slot(tenant, migration_id);
        self.audit
            .record_decision(
                tenant,
                AuditAction::MigrationEnd,
                Some("migration_engine".to_string()),
                serde_json::json!({"status": format!("{final_status:?}"), "migration_id": migration_id}),
            )
            .await
            .ok();
    }
}

enum RunFailure {
    Fatal(String),
    Cancelled,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::audit::InMemoryAuditStore;
    use crate::collection::MockCollectionClient;
    use crate::config::MigrationConfig;
    use crate::dedup::{DocumentChunk, InMemoryChunkStore};
    use crate::metadata::CollectionStatus;
    use crate::provider::MockProvider;

    use super::*;

    fn chunk(tenant: &str, id: &str) -> DocumentChunk {
        DocumentChunk {
            chunk_id: id.to_string(),
            tenant: tenant.to_string(),
            document_id: "doc-1".to_string(),
            chunk_index: 0,
            content: format!("content for {id}"),
            vector_id: None,
            metadata: Default::default(),
            created_at: chrono::Utc::now(),
        }
    }

    async fn build_engine(
        chunk_count: usize,
    ) -> (
        Arc<MigrationEngine<InMemoryChunkStore, MockCollectionClient, InMemoryAuditStore>>,
        Arc<MetadataStore>,
    ) {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        chunk_store.seed((0..chunk_count).map(|i| chunk("t1", &format!("c{i}"))).collect());

        let collection_client = Arc::new(MockCollectionClient::new());
        collection_client.create_collection("t1", 4).await.unwrap();

        let metadata = Arc::new(MetadataStore::new());
        metadata.upsert("t1", "old-provider", "old-model", 4, chunk_count as u64, CollectionStatus::Active);

        let audit = Arc::new(AuditTrail::new(InMemoryAuditStore::new()));
        let registry = ProviderRegistry::new()
            .with_provider(Arc::new(MockProvider::new("new-provider", 8)))
            .with_provider(Arc::new(MockProvider::new("old-provider", 4)));

        let mut config = MigrationConfig::default();
        config.batch_size = 2;
        config.verify = true;

        let engine = Arc::new(MigrationEngine::new(config, chunk_store, collection_client, Arc::clone(&metadata), audit, registry));
        (engine, metadata)
    }

    async fn wait_for_terminal(
        engine: &MigrationEngine<InMemoryChunkStore, MockCollectionClient, InMemoryAuditStore>,
        migration_id: &str,
    ) -> MigrationProgress {
        for _ in 0..200 {
            let progress = engine.progress(migration_id).unwrap();
            if progress.status.is_terminal() {
                return progress;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("migration did not reach a terminal status in time");
    }

    #[tokio::test]
    async fn successful_migration_completes_and_swaps_dimension() {
        let (engine, metadata) = build_engine(5).await;
        let progress = engine
            .start_migration("t1", "new-provider", "new-model", None)
            .await
            .unwrap();

        let final_progress = wait_for_terminal(&engine, &progress.migration_id).await;
        assert_eq!(final_progress.status, MigrationStatus::Completed);
        assert_eq!(final_progress.processed_chunks, 5);

        let row = metadata.get("t1").unwrap();
        assert_eq!(row.current.provider, "new-provider");
        assert_eq!(row.current.dimension, 8);
        assert!(row.history[0].migration_completed);
    }

    #[tokio::test]
    async fn second_concurrent_migration_for_same_tenant_is_rejected() {
        let (engine, _metadata) = build_engine(5).await;
        let first = engine.start_migration("t1", "new-provider", "new-model", None).await.unwrap();

        let second = engine.start_migration("t1", "new-provider", "new-model", None).await;
        assert!(matches!(second, Err(MigrationError::AlreadyActive { .. })));

        wait_for_terminal(&engine, &first.migration_id).await;
    }

    #[tokio::test]
    async fn migration_to_unregistered_provider_fails_and_rolls_back() {
        let (engine, metadata) = build_engine(3).await;
        let progress = engine
            .start_migration("t1", "no-such-provider", "m1", None)
            .await
            .unwrap();

        let final_progress = wait_for_terminal(&engine, &progress.migration_id).await;
        assert_eq!(final_progress.status, MigrationStatus::Failed);

        let row = metadata.get("t1").unwrap();
        assert_eq!(row.current.provider, "old-provider");
    }

    #[tokio::test]
    async fn cancelling_a_migration_rolls_it_back() {
        let (engine, metadata) = build_engine(50).await;
        let progress = engine
            .start_migration("t1", "new-provider", "new-model", None)
            .await
            .unwrap();

        engine.cancel(&progress.migration_id).unwrap();
        let final_progress = wait_for_terminal(&engine, &progress.migration_id).await;
        assert_eq!(final_progress.status, MigrationStatus::Cancelled);

        let row = metadata.get("t1").unwrap();
        assert_eq!(row.current.provider, "old-provider");
    }

    #[tokio::test]
    async fn same_configuration_completes_immediately_with_no_chunks_processed() {
        let (engine, _metadata) = build_engine(3).await;
        let progress = engine
            .start_migration("t1", "old-provider", "old-model", None)
            .await
            .unwrap();
        let final_progress = wait_for_terminal(&engine, &progress.migration_id).await;
        assert_eq!(final_progress.status, MigrationStatus::Completed);
        assert_eq!(final_progress.processed_chunks, 0);
    }
}
