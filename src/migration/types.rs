//! Migration Engine data model.

use chrono::{DateTime, Utc};

use crate::metadata::EmbeddingConfig;

/// Lifecycle status of a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Created but not yet picked up by the phase runner.
    NotStarted,
    /// Validating the target provider/model and credential.
    Preparing,
    /// Actively embedding and writing chunks.
    InProgress,
    /// Verifying and finalizing.
    Completing,
    /// Terminal: succeeded.
    Completed,
    /// Terminal: failed without (or after exhausting) rollback.
    Failed,
    /// Restoring the original configuration after a failure or cancellation.
    RollingBack,
    /// Terminal: rolled back successfully.
    RolledBack,
    /// Terminal: cancelled before completion.
    Cancelled,
}

impl MigrationStatus {
    /// Whether this status will never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::RolledBack | Self::Cancelled
        )
    }
}

/// Which phase of the state machine a migration is currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    /// Confirm the target provider/model/credential are usable.
    Validation,
    /// Snapshot the original configuration for rollback.
    Backup,
    /// Create the temporary target collection.
    NewCollection,
    /// Re-embed and write chunks in batches.
    DataMigration,
    /// Confirm the new collection's shape matches expectations.
    Verification,
    /// Swap the canonical collection over to the new data.
    Finalization,
    /// Remove temporary collections.
    Cleanup,
}

/// Progress and status for one migration.
#[derive(Debug, Clone)]
pub struct MigrationProgress {
    /// Migration id.
    pub migration_id: String,
    /// Owning tenant.
    pub tenant: String,
    /// Current status.
    pub status: MigrationStatus,
    /// Current phase.
    pub phase: MigrationPhase,
    /// Chunks discovered for migration (known only once data-migration starts).
    pub total_chunks: u64,
    /// Chunks successfully re-embedded and written.
    pub processed_chunks: u64,
    /// Chunks that failed after exhausting retries.
    pub failed_chunks: u64,
    /// Current batch index, 1-based, 0 before data migration starts.
    pub current_batch: u64,
    /// Total batches at the configured batch size.
    pub total_batches: u64,
    /// When the migration was created.
    pub started_at: DateTime<Utc>,
    /// Last progress update.
    pub last_update: DateTime<Utc>,
    /// Estimated wall-clock completion time, refreshed each batch.
    pub estimated_completion: Option<DateTime<Utc>>,
    /// The last error encountered, if any (set on failure; retained through rollback).
    pub error: Option<String>,
    /// Whether rollback is available for this migration (mirrors config at start time).
    pub rollback_available: bool,
    /// When this migration reached a terminal status, used for retention sweeping.
    pub terminal_at: Option<DateTime<Utc>>,
}

impl MigrationProgress {
    /// Creates a freshly-started progress record.
    pub fn new(migration_id: impl Into<String>, tenant: impl Into<String>, rollback_available: bool) -> Self {
        let now = Utc::now();
        Self {
            migration_id: migration_id.into(),
            tenant: tenant.into(),
            status: MigrationStatus::Preparing,
            phase: MigrationPhase::Validation,
            total_chunks: 0,
            processed_chunks: 0,
            failed_chunks: 0,
            current_batch: 0,
            total_batches: 0,
            started_at: now,
            last_update: now,
            estimated_completion: None,
            error: None,
            rollback_available,
            terminal_at: None,
        }
    }

    /// Marks a terminal status, stamping `terminal_at` for retention sweeping.
    pub fn finish(&mut self, status: MigrationStatus, error: Option<String>) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.error = error.or(self.error.take());
        self.last_update = Utc::now();
        self.terminal_at = Some(self.last_update);
    }
}

/// Snapshot taken before risky phases run, used to undo a failed migration.
#[derive(Debug, Clone)]
pub struct RollbackInfo {
    /// Migration this snapshot belongs to.
    pub migration_id: String,
    /// Owning tenant.
    pub tenant: String,
    /// The tenant's configuration before this migration started.
    pub original_config: EmbeddingConfig,
    /// The canonical collection key (== tenant id) at the time of backup.
    pub original_collection_key: String,
    /// The backup collection's key, if one was conceptually taken.
    pub backup_collection_key: String,
    /// The temporary target collection's key, physically created during the
    /// NewCollection phase and never promoted to canonical on a failed migration.
    pub new_collection_key: String,
    /// Whether the backup step ran. Vector-store backups are conceptual in this
    /// deployment (the original collection is never touched before finalization, so
    /// "restoring" it is a no-op in the common case); this flag just records that the
    /// phase executed.
    pub backup_created: bool,
    /// Chunk ids successfully written to the new collection so far.
    pub migrated_chunk_ids: Vec<String>,
    /// When this snapshot was taken.
    pub created_at: DateTime<Utc>,
}
