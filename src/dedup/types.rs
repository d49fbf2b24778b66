//! Dedup engine data model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A chunk of a tenant's document, optionally backed by a vector in the collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Stable chunk id.
    pub chunk_id: String,
    /// Owning tenant.
    pub tenant: String,
    /// Owning document id.
    pub document_id: String,
    /// Position of this chunk within the document.
    pub chunk_index: u32,
    /// Chunk text content.
    pub content: String,
    /// Vector id in the tenant's collection, if embedded.
    pub vector_id: Option<u64>,
    /// Free-form metadata.
    pub metadata: BTreeMap<String, Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Similarity tiering thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedupThresholds {
    /// Exact-match tier.
    pub exact: f64,
    /// High-similarity tier; the merge threshold in conservative mode.
    pub high: f64,
    /// Medium-similarity tier.
    pub medium: f64,
    /// Low-similarity (detection) tier.
    pub low: f64,
}

impl Default for DedupThresholds {
    fn default() -> Self {
        Self {
            exact: 1.0,
            high: 0.95,
            medium: 0.85,
            low: 0.70,
        }
    }
}

impl DedupThresholds {
    /// Validates the thresholds are monotonically decreasing and within `[0, 1]`.
    pub fn validate(&self) -> Result<(), String> {
        let tiers = [self.exact, self.high, self.medium, self.low];
        if tiers.iter().any(|t| !(0.0..=1.0).contains(t)) {
            return Err("dedup thresholds must be within [0, 1]".to_string());
        }
        if !(self.exact >= self.high && self.high >= self.medium && self.medium >= self.low) {
            return Err("dedup thresholds must satisfy exact >= high >= medium >= low".to_string());
        }
        Ok(())
    }

    /// Classifies a similarity score into a tier name, or `None` below `low`.
    pub fn tier(&self, score: f64) -> Option<&'static str> {
        if score >= self.exact {
            Some("exact")
        } else if score >= self.high {
            Some("high")
        } else if score >= self.medium {
            Some("medium")
        } else if score >= self.low {
            Some("low")
        } else {
            None
        }
    }
}

/// Merge strategy used when deciding whether a candidate group is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStrategy {
    /// Merge only when every duplicate's similarity to the primary is >= high and
    /// metadata is compatible; otherwise preserve.
    Conservative,
    /// Merge whenever metadata is compatible, regardless of tier above the detection
    /// threshold.
    Aggressive,
    /// Never merge automatically; always emit a [`ConflictCase`].
    Manual,
    /// Among conflicting chunks, prefer the oldest.
    OldestWins,
    /// Among conflicting chunks, prefer the newest.
    NewestWins,
    /// Among conflicting chunks, prefer the longest content.
    LongestWins,
}

/// Pairwise similarity between two chunks.
#[derive(Debug, Clone, Copy)]
pub struct Similarity {
    /// First chunk id index into the caller's chunk list.
    pub a: usize,
    /// Second chunk id index.
    pub b: usize,
    /// Longest-common-subsequence-style ratio on normalized content; this is the value
    /// merge-threshold logic uses.
    pub sequence_score: f64,
    /// Jaccard ratio over word sets; reported alongside sequence score but not used by
    /// merge threshold logic.
    pub jaccard_score: f64,
    /// Whether metadata is compatible between the two chunks.
    pub metadata_compatible: bool,
}

/// The action taken (or recommended) for a detected similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupAction {
    /// Chunks were merged into a primary.
    Merge,
    /// Chunks were left as-is.
    Preserve,
    /// A policy was (re)configured; not a chunk-level action.
    Configure,
}

/// Attribution of a merged chunk's content to its source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAttribution {
    /// Source chunk id.
    pub chunk_id: String,
    /// Whether this source became the primary.
    pub is_primary: bool,
}

/// Immutable record of a merge/preserve decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupDecision {
    /// Decision id.
    pub decision_id: String,
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
    /// Action taken.
    pub action: DedupAction,
    /// The chunk the group was merged into (or evaluated against).
    pub primary_chunk_id: String,
    /// Chunks folded into the primary (empty for `preserve`).
    pub duplicate_chunk_ids: Vec<String>,
    /// Similarity score driving the decision.
    pub similarity_score: f64,
    /// Human-readable reason.
    pub reason: String,
    /// Merged metadata snapshot (post-merge state of the primary).
    pub merged_metadata: BTreeMap<String, Value>,
    /// Attribution list; exactly one entry has `is_primary = true` for merge actions.
    pub source_attribution: Vec<SourceAttribution>,
}

/// Why a [`ConflictCase`] could not be resolved mechanically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Similarity is below the merge threshold but above the detection threshold.
    AmbiguousSimilarity,
    /// Similarity is high but metadata disagrees.
    MetadataConflict,
    /// Chunks are similar but belong to different documents and policy disallows
    /// cross-document merges.
    CrossDocument,
}

/// A detected similarity that requires a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCase {
    /// Case id.
    pub case_id: String,
    /// Owning tenant.
    pub tenant: String,
    /// Chunks involved (>= 2).
    pub chunk_ids: Vec<String>,
    /// Pairwise similarity scores, parallel to `chunk_ids` windows.
    pub similarity_scores: Vec<f64>,
    /// Why this is a conflict.
    pub conflict_type: ConflictType,
    /// Suggested action per policy strategy.
    pub suggested_action: DedupAction,
    /// Confidence in the suggestion, in `[0, 1]`.
    pub confidence: f64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Whether a human/operator has resolved this case.
    pub resolved: bool,
    /// Resolution action, once resolved.
    pub resolution_action: Option<ManualResolution>,
    /// Who resolved it.
    pub resolver: Option<String>,
    /// When it was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Manual resolution actions available on a [`ConflictCase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualResolution {
    /// Merge the involved chunks.
    Merge,
    /// Leave them as-is.
    Preserve,
    /// Remove the first chunk in the case.
    RemoveFirst,
    /// Remove the second chunk in the case.
    RemoveSecond,
}

/// Metadata fields whose disagreement makes two chunks metadata-incompatible.
pub const CRITICAL_METADATA_FIELDS: &[&str] = &["page", "section", "document_type"];

/// Result of a `deduplicate` call.
#[derive(Debug, Clone, Default)]
pub struct DeduplicationResult {
    /// Decisions recorded (merges and preserves).
    pub decisions: Vec<DedupDecision>,
    /// Conflict cases newly created.
    pub conflicts: Vec<ConflictCase>,
    /// Chunk ids deleted as a result of merges.
    pub deleted_chunk_ids: Vec<String>,
}
