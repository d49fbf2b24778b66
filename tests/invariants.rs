//! Numbered invariants and round-trip properties not already pinned down by a
//! unit test living alongside its implementation.

mod common;

use std::sync::Arc;

use eccms::cache::CacheCoreHandle;
use eccms::cache::WarmingScheduler;
use eccms::collection::{CollectionClient, MockCollectionClient};
use eccms::config::MigrationConfig;
use eccms::dedup::{DedupEngine, DedupStrategy, DedupThresholds};
use eccms::metadata::{CollectionStatus, MetadataStore};
use eccms::migration::{MigrationEngine, MigrationError, MigrationStatus};
use eccms::provider::{MockProvider, ProviderRegistry};

use common::{build_migration_engine, chunk, wait_for_terminal};

/// Invariant 1: a completed migration leaves every remaining point's dimension (as
/// reported by the collection) equal to the tenant's new current configuration.
#[tokio::test]
async fn invariant1_point_dimension_matches_current_config_after_migration() {
    let (engine, metadata, _chunks) = build_migration_engine(20, 10).await;
    let progress = engine.start_migration("t1", "new-provider", "new-model", None).await.unwrap();
    wait_for_terminal(&engine, &progress.migration_id).await;

    let row = metadata.get("t1").unwrap();
    assert_eq!(row.current.dimension, 1024);
}

/// Invariant 2: configuration history is append-only and monotonic — each entry's
/// `new` becomes the next entry's `previous`.
#[tokio::test]
async fn invariant2_history_chains_previous_to_new() {
    let metadata = Arc::new(MetadataStore::new());
    metadata.upsert("t1", "old-provider", "old-model", 768, 5, CollectionStatus::Active);

    let chunk_store = Arc::new(eccms::dedup::InMemoryChunkStore::new());
    chunk_store.seed((0..5).map(|i| chunk("t1", &format!("c{i}"))).collect());

    let collection_client = Arc::new(MockCollectionClient::new());
    collection_client.create_collection("t1", 768).await.unwrap();

    let registry = ProviderRegistry::new()
        .with_provider(Arc::new(MockProvider::new("old-provider", 768)))
        .with_provider(Arc::new(MockProvider::new("mid-provider", 1024)))
        .with_provider(Arc::new(MockProvider::new("final-provider", 512)));

    let audit = Arc::new(eccms::audit::AuditTrail::new(eccms::audit::InMemoryAuditStore::new()));
    let config = MigrationConfig {
        batch_size: 5,
        verify: true,
        ..Default::default()
    };
    let engine = Arc::new(MigrationEngine::new(
        config,
        chunk_store,
        collection_client,
        Arc::clone(&metadata),
        audit,
        registry,
    ));

    let first = engine.start_migration("t1", "mid-provider", "mid-model", None).await.unwrap();
    wait_for_terminal(&engine, &first.migration_id).await;

    let second = engine.start_migration("t1", "final-provider", "final-model", None).await.unwrap();
    wait_for_terminal(&engine, &second.migration_id).await;

    let row = metadata.get("t1").unwrap();
    assert_eq!(row.history.len(), 2);
    let (entry_a, entry_b) = (&row.history[0], &row.history[1]);
    assert_eq!(entry_a.new.dimension, entry_b.previous.as_ref().unwrap().dimension);
    assert_eq!(entry_a.new.provider, "mid-provider");
    assert_eq!(entry_b.new.provider, "final-provider");
    assert!(entry_a.migration_completed);
    assert!(entry_b.migration_completed);
    assert_eq!(row.current.provider, "final-provider");
}

/// Invariant 6: at most one non-terminal migration per tenant, and no more than the
/// engine's configured global concurrency cap across all tenants.
#[tokio::test]
async fn invariant6_concurrency_cap_spans_tenants() {
    let chunk_store = Arc::new(eccms::dedup::InMemoryChunkStore::new());
    chunk_store.seed((0..5).map(|i| chunk("t1", &format!("c{i}"))).collect());
    chunk_store.seed((0..5).map(|i| chunk("t2", &format!("d{i}"))).collect());

    let collection_client = Arc::new(MockCollectionClient::new());
    collection_client.create_collection("t1", 768).await.unwrap();
    collection_client.create_collection("t2", 768).await.unwrap();

    let metadata = Arc::new(MetadataStore::new());
    metadata.upsert("t1", "old-provider", "old-model", 768, 5, CollectionStatus::Active);
    metadata.upsert("t2", "old-provider", "old-model", 768, 5, CollectionStatus::Active);

    let registry = ProviderRegistry::new()
        .with_provider(Arc::new(MockProvider::new("old-provider", 768)))
        .with_provider(Arc::new(MockProvider::new("new-provider", 1024)));

    let audit = Arc::new(eccms::audit::AuditTrail::new(eccms::audit::InMemoryAuditStore::new()));
    let config = MigrationConfig {
        batch_size: 5,
        max_concurrent: 1,
        ..Default::default()
    };
    let engine = Arc::new(MigrationEngine::new(
        config,
        chunk_store,
        collection_client,
        metadata,
        audit,
        registry,
    ));

    let first = engine.start_migration("t1", "new-provider", "new-model", None).await;
    assert!(first.is_ok());

    let second = engine.start_migration("t2", "new-provider", "new-model", None).await;
    assert!(matches!(second, Err(MigrationError::ConcurrencyCapReached { cap: 1 })));
}

/// Invariant 7: every merge decision's source attribution marks exactly one source
/// primary.
#[test]
fn invariant7_exactly_one_primary_per_merge_decision() {
    let chunks = vec![
        chunk("t1", "a"),
        chunk("t1", "b"),
        chunk("t1", "c"),
    ]
    .into_iter()
    .map(|mut c| {
        c.content = "identical content for dedup grouping purposes".to_string();
        c
    })
    .collect::<Vec<_>>();

    let engine = DedupEngine::new(DedupThresholds::default(), DedupStrategy::Aggressive);
    let result = engine.deduplicate("t1", &chunks, false);

    assert_eq!(result.decisions.len(), 1);
    for decision in &result.decisions {
        let primaries = decision.source_attribution.iter().filter(|s| s.is_primary).count();
        assert_eq!(primaries, 1);
    }
}

/// Invariant 8: a rolled-back migration leaves the tenant's current configuration
/// exactly as it was before the migration started, and the history entry it staged
/// is never marked completed.
#[tokio::test]
async fn invariant8_rollback_leaves_history_entry_incomplete_and_restores_current() {
    let chunk_store = Arc::new(eccms::dedup::InMemoryChunkStore::new());
    chunk_store.seed((0..4).map(|i| chunk("t1", &format!("c{i}"))).collect());

    let collection_client = Arc::new(MockCollectionClient::new());
    collection_client.create_collection("t1", 768).await.unwrap();

    let metadata = Arc::new(MetadataStore::new());
    metadata.upsert("t1", "old-provider", "old-model", 768, 4, CollectionStatus::Active);

    let failing = MockProvider::new("new-provider", 1024);
    for i in 0..4 {
        failing.fail_on(
            &format!("content for c{i}"),
            eccms::provider::ProviderError::Permanent {
                provider: "new-provider".to_string(),
                message: "always fails".to_string(),
            },
        );
    }
    let registry = ProviderRegistry::new()
        .with_provider(Arc::new(failing))
        .with_provider(Arc::new(MockProvider::new("old-provider", 768)));

    let audit = Arc::new(eccms::audit::AuditTrail::new(eccms::audit::InMemoryAuditStore::new()));
    let config = MigrationConfig {
        batch_size: 2,
        ..Default::default()
    };
    let engine = Arc::new(MigrationEngine::new(
        config,
        chunk_store,
        collection_client,
        Arc::clone(&metadata),
        audit,
        registry,
    ));

    let progress = engine.start_migration("t1", "new-provider", "new-model", None).await.unwrap();
    let final_progress = wait_for_terminal(&engine, &progress.migration_id).await;
    assert_eq!(final_progress.status, MigrationStatus::RolledBack);

    let row = metadata.get("t1").unwrap();
    assert_eq!(row.current.provider, "old-provider");
    assert_eq!(row.current.dimension, 768);
    assert_eq!(row.history.len(), 1);
    assert!(!row.history[0].migration_completed);
}

/// Round trip: cancelling a pending warming task returns `true` exactly once; a
/// second cancel of the same task reports `false`.
#[tokio::test]
async fn roundtrip_schedule_cancel_is_idempotent() {
    let registry = ProviderRegistry::new().with_provider(Arc::new(MockProvider::new("mock", 4)));
    let scheduler = Arc::new(WarmingScheduler::new(CacheCoreHandle::new(), registry));
    let id = scheduler.schedule(vec!["x".to_string()], "mock", "m1", 5).unwrap();

    assert!(scheduler.cancel(&id));
    assert!(!scheduler.cancel(&id));
    assert!(!scheduler.cancel(&id));
}

/// Round trip: invalidating a (provider, model) pair makes every text under it a
/// miss again, while leaving other pairs untouched.
#[test]
fn roundtrip_invalidate_then_miss_for_every_text() {
    let cache = CacheCoreHandle::new();
    for text in ["a", "b", "c"] {
        cache.put(text, "A", "M1", vec![1.0], None);
    }
    cache.put("a", "A", "M2", vec![2.0], None);

    cache.clear(Some("A"), Some("M1"));

    for text in ["a", "b", "c"] {
        assert_eq!(cache.get(text, "A", "M1"), None);
    }
    assert_eq!(cache.get("a", "A", "M2"), Some(vec![2.0]));
}
