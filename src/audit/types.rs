//! Audit trail data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The kind of action an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A dedup merge was performed.
    DedupMerge,
    /// A dedup candidate was preserved (not merged).
    DedupPreserve,
    /// A dedup policy was (re)configured.
    DedupConfigure,
    /// A conflict case was manually resolved.
    ConflictResolve,
    /// A tenant's embedding configuration changed.
    ConfigurationChange,
    /// A migration started.
    MigrationStart,
    /// A migration ended (success, failure, or rollback).
    MigrationEnd,
}

/// An immutable audit record: append-only, every destructive or policy-affecting
/// action yields one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Record id.
    pub id: String,
    /// Owning tenant.
    pub tenant: String,
    /// When the action occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub action: AuditAction,
    /// Actor (user id, "system", or a migration/process id).
    pub actor: Option<String>,
    /// Action-specific structured payload (decision snapshot, migration progress, ...).
    pub detail: Value,
}

impl AuditRecord {
    /// Builds a new record, stamping id and timestamp.
    pub fn new(tenant: &str, action: AuditAction, actor: Option<String>, detail: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant: tenant.to_string(),
            timestamp: Utc::now(),
            action,
            actor,
            detail,
        }
    }
}

/// Filters accepted by [`super::store::AuditStore::query`].
#[derive(Debug, Clone, Default)]
pub struct AuditFilters {
    /// Restrict to a single action kind.
    pub action: Option<AuditAction>,
    /// Restrict to records at or after this time.
    pub since: Option<DateTime<Utc>>,
    /// Restrict to records at or before this time.
    pub until: Option<DateTime<Utc>>,
}

/// Pagination parameters.
#[derive(Debug, Clone, Copy)]
pub struct Paging {
    /// Maximum records to return.
    pub limit: usize,
    /// Records to skip, for the next page.
    pub offset: usize,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

/// A page of query results.
#[derive(Debug, Clone)]
pub struct AuditPage {
    /// Records in this page, ordered timestamp descending, id as tiebreak.
    pub records: Vec<AuditRecord>,
    /// Total records matching the filter, independent of paging.
    pub total: usize,
}

/// Export format for [`super::store::AuditStore::export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// JSON array of records.
    Json,
    /// CSV with a fixed column header.
    Csv,
}

/// Summary statistics over a time window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditStats {
    /// Total records in the window.
    pub total: usize,
    /// Count per action kind.
    pub by_action: std::collections::BTreeMap<String, usize>,
}
