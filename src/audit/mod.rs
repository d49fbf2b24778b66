//! Append-only audit trail for every destructive or policy-affecting action: dedup
//! merges, conflict resolution, configuration changes, and migration lifecycle events
//!.

pub mod error;
pub mod store;
pub mod types;

pub use error::AuditError;
pub use store::{AuditStore, AuditTrail, InMemoryAuditStore};
pub use types::{AuditAction, AuditFilters, AuditPage, AuditRecord, AuditStats, ExportFormat, Paging};
