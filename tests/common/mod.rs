//! Shared harness for integration tests: builders over the in-memory/mock
//! collaborators every boundary scenario and invariant test assembles.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use eccms::audit::{AuditTrail, InMemoryAuditStore};
use eccms::collection::{CollectionClient, MockCollectionClient};
use eccms::config::MigrationConfig;
use eccms::dedup::{DocumentChunk, InMemoryChunkStore};
use eccms::metadata::{CollectionStatus, MetadataStore};
use eccms::migration::{MigrationEngine, MigrationProgress};
use eccms::provider::{MockProvider, ProviderRegistry};

pub type TestEngine = MigrationEngine<InMemoryChunkStore, MockCollectionClient, InMemoryAuditStore>;

/// Builds a chunk with deterministic, distinguishable content for the given index.
pub fn chunk(tenant: &str, id: &str) -> DocumentChunk {
    DocumentChunk {
        chunk_id: id.to_string(),
        tenant: tenant.to_string(),
        document_id: "doc-1".to_string(),
        chunk_index: 0,
        content: format!("content for {id}"),
        vector_id: None,
        metadata: BTreeMap::new(),
        created_at: chrono::Utc::now(),
    }
}

/// Assembles a migration engine over `chunk_count` seeded chunks for tenant `t1`,
/// starting at (`old-provider`, `old-model`, dim 768), with a registry that also
/// knows `new-provider` (dim 1024).
pub async fn build_migration_engine(
    chunk_count: usize,
    batch_size: usize,
) -> (Arc<TestEngine>, Arc<MetadataStore>, Arc<InMemoryChunkStore>) {
    let chunk_store = Arc::new(InMemoryChunkStore::new());
    chunk_store.seed((0..chunk_count).map(|i| chunk("t1", &format!("c{i}"))).collect());

    let collection_client = Arc::new(MockCollectionClient::new());
    collection_client.create_collection("t1", 768).await.unwrap();

    let metadata = Arc::new(MetadataStore::new());
    metadata.upsert("t1", "old-provider", "old-model", 768, chunk_count as u64, CollectionStatus::Active);

    let audit = Arc::new(AuditTrail::new(InMemoryAuditStore::new()));
    let registry = ProviderRegistry::new()
        .with_provider(Arc::new(MockProvider::new("new-provider", 1024)))
        .with_provider(Arc::new(MockProvider::new("old-provider", 768)));

    let config = MigrationConfig {
        batch_size,
        verify: true,
        ..Default::default()
    };

    let engine = Arc::new(MigrationEngine::new(
        config,
        Arc::clone(&chunk_store),
        collection_client,
        Arc::clone(&metadata),
        audit,
        registry,
    ));
    (engine, metadata, chunk_store)
}

/// Polls a migration's progress until it reaches a terminal status, or panics after
/// a generous timeout — every mock collaborator here is in-memory, so a real
/// migration settles in well under this bound.
pub async fn wait_for_terminal(engine: &TestEngine, migration_id: &str) -> MigrationProgress {
    for _ in 0..500 {
        let progress = engine.progress(migration_id).unwrap();
        if progress.status.is_terminal() {
            return progress;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("migration {migration_id} did not reach a terminal status in time");
}
