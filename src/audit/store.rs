//! Audit trail storage and reporting.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::Value;

use super::error::AuditError;
use super::types::{AuditAction, AuditFilters, AuditPage, AuditRecord, AuditStats, ExportFormat, Paging};

/// Storage seam for the audit trail. Records are append-only; the only mutation this
/// trait exposes is retention-driven `cleanup`.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Appends a single record.
    async fn append(&self, record: AuditRecord) -> Result<(), AuditError>;

    /// Appends many records as one logical batch.
    async fn append_batch(&self, records: Vec<AuditRecord>) -> Result<(), AuditError> {
        for record in records {
            self.append(record).await?;
        }
        Ok(())
    }

    /// Queries records for a tenant, deterministic (timestamp desc, id tiebreak).
    async fn query(
        &self,
        tenant: &str,
        filters: &AuditFilters,
        paging: Paging,
    ) -> Result<AuditPage, AuditError>;

    /// Deletes records older than `retention_days`. Only ever invoked by explicit
    /// operator request — cleanup is never triggered automatically.
    async fn cleanup(&self, tenant: &str, retention_days: i64) -> Result<usize, AuditError>;
}

/// In-memory [`AuditStore`].
#[derive(Default)]
pub struct InMemoryAuditStore {
    records: parking_lot::RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_desc(records: &mut [AuditRecord]) {
    records.sort_by(|a, b| match b.timestamp.cmp(&a.timestamp) {
        Ordering::Equal => b.id.cmp(&a.id),
        other => other,
    });
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.records.write().push(record);
        Ok(())
    }

    async fn query(
        &self,
        tenant: &str,
        filters: &AuditFilters,
        paging: Paging,
    ) -> Result<AuditPage, AuditError> {
        let guard = self.records.read();
        let mut matched: Vec<AuditRecord> = guard
            .iter()
            .filter(|r| r.tenant == tenant)
            .filter(|r| filters.action.is_none_or(|a| a == r.action))
            .filter(|r| filters.since.is_none_or(|s| r.timestamp >= s))
            .filter(|r| filters.until.is_none_or(|u| r.timestamp <= u))
            .cloned()
            .collect();

        sort_desc(&mut matched);
        let total = matched.len();
        let page = matched
            .into_iter()
            .skip(paging.offset)
            .take(paging.limit)
            .collect();

        Ok(AuditPage { records: page, total })
    }

    async fn cleanup(&self, tenant: &str, retention_days: i64) -> Result<usize, AuditError> {
        let cutoff = Utc::now() - ChronoDuration::days(retention_days);
        let mut guard = self.records.write();
        let before = guard.len();
        guard.retain(|r| !(r.tenant == tenant && r.timestamp < cutoff));
        Ok(before - guard.len())
    }
}

/// Audit & Reporting facade: wraps an [`AuditStore`] with higher-level queries
/// (`chunk_history`, `stats`, `export`).
pub struct AuditTrail<S: AuditStore> {
    store: S,
}

impl<S: AuditStore> AuditTrail<S> {
    /// Wraps a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Records a single decision-driven action.
    pub async fn record_decision(
        &self,
        tenant: &str,
        action: AuditAction,
        actor: Option<String>,
        detail: Value,
    ) -> Result<(), AuditError> {
        self.store
            .append(AuditRecord::new(tenant, action, actor, detail))
            .await
    }

    /// Records several related actions as one batch (e.g. every decision from a single
    /// `deduplicate` call).
    pub async fn record_batch(
        &self,
        tenant: &str,
        action: AuditAction,
        actor: Option<String>,
        details: Vec<Value>,
    ) -> Result<(), AuditError> {
        let records = details
            .into_iter()
            .map(|detail| AuditRecord::new(tenant, action, actor.clone(), detail))
            .collect();
        self.store.append_batch(records).await
    }

    /// Delegates to the underlying store's query.
    pub async fn query(
        &self,
        tenant: &str,
        filters: &AuditFilters,
        paging: Paging,
    ) -> Result<AuditPage, AuditError> {
        self.store.query(tenant, filters, paging).await
    }

    /// All records mentioning a specific chunk id, newest first.
    pub async fn chunk_history(
        &self,
        chunk_id: &str,
        tenant: &str,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        let page = self
            .store
            .query(tenant, &AuditFilters::default(), Paging { limit: usize::MAX, offset: 0 })
            .await?;
        Ok(page
            .records
            .into_iter()
            .filter(|r| record_mentions_chunk(r, chunk_id))
            .collect())
    }

    /// Aggregate counts over the last `window_days` days.
    pub async fn stats(&self, tenant: &str, window_days: i64) -> Result<AuditStats, AuditError> {
        let since = Utc::now() - ChronoDuration::days(window_days);
        let page = self
            .store
            .query(
                tenant,
                &AuditFilters { since: Some(since), ..Default::default() },
                Paging { limit: usize::MAX, offset: 0 },
            )
            .await?;

        let mut stats = AuditStats { total: page.records.len(), ..Default::default() };
        for record in &page.records {
            *stats
                .by_action
                .entry(format!("{:?}", record.action))
                .or_insert(0) += 1;
        }
        Ok(stats)
    }

    /// Exports records in `format`, optionally bounded to `[since, until]`.
    pub async fn export(
        &self,
        tenant: &str,
        format: ExportFormat,
        range: Option<(chrono::DateTime<Utc>, chrono::DateTime<Utc>)>,
    ) -> Result<String, AuditError> {
        let filters = AuditFilters {
            since: range.map(|(s, _)| s),
            until: range.map(|(_, u)| u),
            ..Default::default()
        };
        let page = self
            .store
            .query(tenant, &filters, Paging { limit: usize::MAX, offset: 0 })
            .await?;

        match format {
            ExportFormat::Json => serde_json::to_string(&page.records)
                .map_err(|e| AuditError::Storage(e.to_string())),
            ExportFormat::Csv => {
                let mut out = String::from("id,tenant,timestamp,action,actor\n");
                for r in &page.records {
                    out.push_str(&format!(
                        "{},{},{},{:?},{}\n",
                        r.id,
                        r.tenant,
                        r.timestamp.to_rfc3339(),
                        r.action,
                        r.actor.clone().unwrap_or_default()
                    ));
                }
                Ok(out)
            }
        }
    }

    /// Deletes records for `tenant` older than `retention_days`.
    pub async fn cleanup(&self, tenant: &str, retention_days: i64) -> Result<usize, AuditError> {
        self.store.cleanup(tenant, retention_days).await
    }
}

fn record_mentions_chunk(record: &AuditRecord, chunk_id: &str) -> bool {
    fn contains(value: &Value, chunk_id: &str) -> bool {
        match value {
            Value::String(s) => s == chunk_id,
            Value::Array(items) => items.iter().any(|v| contains(v, chunk_id)),
            Value::Object(map) => map.values().any(|v| contains(v, chunk_id)),
            _ => false,
        }
    }
    contains(&record.detail, chunk_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trail() -> AuditTrail<InMemoryAuditStore> {
        AuditTrail::new(InMemoryAuditStore::new())
    }

    #[tokio::test]
    async fn record_and_query_round_trips() {
        let trail = trail();
        trail
            .record_decision("t1", AuditAction::DedupMerge, Some("system".into()), json!({"chunk_id": "c1"}))
            .await
            .unwrap();

        let page = trail
            .query("t1", &AuditFilters::default(), Paging::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.records[0].action, AuditAction::DedupMerge);
    }

    #[tokio::test]
    async fn query_is_tenant_scoped() {
        let trail = trail();
        trail
            .record_decision("t1", AuditAction::DedupMerge, None, json!({}))
            .await
            .unwrap();
        trail
            .record_decision("t2", AuditAction::DedupMerge, None, json!({}))
            .await
            .unwrap();

        let page = trail
            .query("t1", &AuditFilters::default(), Paging::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn ordering_is_timestamp_desc() {
        let trail = trail();
        for i in 0..3 {
            trail
                .record_decision("t1", AuditAction::DedupMerge, None, json!({"i": i}))
                .await
                .unwrap();
        }
        let page = trail
            .query("t1", &AuditFilters::default(), Paging::default())
            .await
            .unwrap();
        let timestamps: Vec<_> = page.records.iter().map(|r| r.timestamp).collect();
        let mut sorted = timestamps.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(timestamps, sorted);
    }

    #[tokio::test]
    async fn chunk_history_finds_mentions() {
        let trail = trail();
        trail
            .record_decision(
                "t1",
                AuditAction::DedupMerge,
                None,
                json!({"primary_chunk_id": "c1", "duplicate_chunk_ids": ["c2"]}),
            )
            .await
            .unwrap();

        let history = trail.chunk_history("c2", "t1").await.unwrap();
        assert_eq!(history.len(), 1);

        let none = trail.chunk_history("c999", "t1").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn cleanup_only_removes_requested_tenant() {
        let trail = trail();
        trail
            .record_decision("t1", AuditAction::DedupMerge, None, json!({}))
            .await
            .unwrap();
        trail
            .record_decision("t2", AuditAction::DedupMerge, None, json!({}))
            .await
            .unwrap();

        // retention_days = 0 should remove everything timestamped before "now", which
        // all freshly-created records are not, so nothing is removed yet...
        let removed = trail.cleanup("t1", 9999).await.unwrap();
        assert_eq!(removed, 0);

        let t2_page = trail
            .query("t2", &AuditFilters::default(), Paging::default())
            .await
            .unwrap();
        assert_eq!(t2_page.total, 1);
    }

    #[tokio::test]
    async fn export_json_round_trips_record_count() {
        let trail = trail();
        trail
            .record_decision("t1", AuditAction::DedupMerge, None, json!({}))
            .await
            .unwrap();
        let exported = trail.export("t1", ExportFormat::Json, None).await.unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&exported).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[tokio::test]
    async fn export_csv_has_header_and_one_row_per_record() {
        let trail = trail();
        trail
            .record_decision("t1", AuditAction::MigrationStart, None, json!({}))
            .await
            .unwrap();
        let csv = trail.export("t1", ExportFormat::Csv, None).await.unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.starts_with("id,tenant,timestamp,action,actor"));
    }
}
