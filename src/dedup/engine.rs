//! Detection and merge/preserve decisioning.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::grouping::connected_components;
use super::similarity::{jaccard_similarity, metadata_compatible, sequence_similarity};
use super::types::{
    ConflictCase, ConflictType, DedupAction, DedupDecision, DedupStrategy, DedupThresholds,
    DeduplicationResult, DocumentChunk, Similarity, SourceAttribution,
};

/// Stateless similarity detection and merge-decision logic, shared by
/// [`super::manager::DedupManager`] and tests that want to exercise it without a
/// [`super::store::ChunkStore`].
pub struct DedupEngine {
    thresholds: DedupThresholds,
    strategy: DedupStrategy,
}

impl DedupEngine {
    /// Creates an engine with the given thresholds and merge strategy.
    pub fn new(thresholds: DedupThresholds, strategy: DedupStrategy) -> Self {
        Self {
            thresholds,
            strategy,
        }
    }

    /// Computes all pairwise similarities at or above `threshold` (the detection
    /// floor), using the sequence-match score.
    pub fn detect(&self, chunks: &[DocumentChunk], threshold: f64) -> Vec<Similarity> {
        let mut results = Vec::new();
        for i in 0..chunks.len() {
            for j in (i + 1)..chunks.len() {
                let seq = sequence_similarity(&chunks[i].content, &chunks[j].content);
                if seq < threshold {
                    continue;
                }
                let jac = jaccard_similarity(&chunks[i].content, &chunks[j].content);
                let compatible = metadata_compatible(&chunks[i].metadata, &chunks[j].metadata);
                results.push(Similarity {
                    a: i,
                    b: j,
                    sequence_score: seq,
                    jaccard_score: jac,
                    metadata_compatible: compatible,
                });
            }
        }
        results
    }

    /// Runs detection, groups candidates, decides merge/preserve/conflict for each
    /// group, and returns the decisions plus any new conflict cases. This function is
    /// pure with respect to storage: callers apply `decisions`/`conflicts` themselves.
    pub fn deduplicate(
        &self,
        tenant: &str,
        chunks: &[DocumentChunk],
        cross_document_allowed: bool,
    ) -> DeduplicationResult {
        let pairs = self.detect(chunks, self.thresholds.low);
        let edges: Vec<(usize, usize)> = pairs
            .iter()
            .filter(|p| p.sequence_score >= self.thresholds.high)
            .map(|p| (p.a, p.b))
            .collect();
        let groups = connected_components(chunks.len(), &edges);

        let mut result = DeduplicationResult::default();

        for group in groups {
            let primary_idx = self.select_primary(chunks, &group);
            let primary = &chunks[primary_idx];

            let duplicates: Vec<usize> = group.iter().copied().filter(|&i| i != primary_idx).collect();

            let cross_document = duplicates
                .iter()
                .any(|&i| chunks[i].document_id != primary.document_id);
            if cross_document && !cross_document_allowed {
                result.conflicts.push(self.make_conflict(
                    tenant,
                    chunks,
                    &group,
                    ConflictType::CrossDocument,
                ));
                continue;
            }

            match self.strategy {
                DedupStrategy::Manual => {
                    result.conflicts.push(self.make_conflict(
                        tenant,
                        chunks,
                        &group,
                        ConflictType::AmbiguousSimilarity,
                    ));
                }
                DedupStrategy::Conservative => {
                    let all_high_and_compatible = duplicates.iter().all(|&i| {
                        let sim = self.pair_similarity(&pairs, primary_idx, i);
                        sim.sequence_score >= self.thresholds.high && sim.metadata_compatible
                    });
                    if all_high_and_compatible {
                        result
                            .decisions
                            .push(self.merge(tenant, chunks, primary_idx, &duplicates, &pairs));
                        result
                            .deleted_chunk_ids
                            .extend(duplicates.iter().map(|&i| chunks[i].chunk_id.clone()));
                    } else {
                        let incompatible = duplicates.iter().any(|&i| {
                            !self.pair_similarity(&pairs, primary_idx, i).metadata_compatible
                        });
                        let conflict_type = if incompatible {
                            ConflictType::MetadataConflict
                        } else {
                            ConflictType::AmbiguousSimilarity
                        };
                        result
                            .conflicts
                            .push(self.make_conflict(tenant, chunks, &group, conflict_type));
                    }
                }
                DedupStrategy::Aggressive => {
                    let all_compatible = duplicates.iter().all(|&i| {
                        self.pair_similarity(&pairs, primary_idx, i).metadata_compatible
                    });
                    if all_compatible {
                        result
                            .decisions
                            .push(self.merge(tenant, chunks, primary_idx, &duplicates, &pairs));
                        result
                            .deleted_chunk_ids
                            .extend(duplicates.iter().map(|&i| chunks[i].chunk_id.clone()));
                    } else {
                        result.conflicts.push(self.make_conflict(
                            tenant,
                            chunks,
                            &group,
                            ConflictType::MetadataConflict,
                        ));
                    }
                }
                DedupStrategy::OldestWins
                | DedupStrategy::NewestWins
                | DedupStrategy::LongestWins => {
                    result
                        .decisions
                        .push(self.merge(tenant, chunks, primary_idx, &duplicates, &pairs));
                    result
                        .deleted_chunk_ids
                        .extend(duplicates.iter().map(|&i| chunks[i].chunk_id.clone()));
                }
            }
        }

        result
    }

    fn pair_similarity(&self, pairs: &[Similarity], a: usize, b: usize) -> Similarity {
        pairs
            .iter()
            .find(|p| (p.a == a && p.b == b) || (p.a == b && p.b == a))
            .copied()
            .unwrap_or(Similarity {
                a,
                b,
                sequence_score: 0.0,
                jaccard_score: 0.0,
                metadata_compatible: true,
            })
    }

    /// Primary selection: argmax over `age_bonus + content_length/1000 +
    /// metadata_field_count/10`, ties broken by earliest creation timestamp.
    fn select_primary(&self, chunks: &[DocumentChunk], group: &[usize]) -> usize {
        let oldest = group
            .iter()
            .map(|&i| chunks[i].created_at)
            .min()
            .unwrap_or_else(Utc::now);

        let mut best_idx = group[0];
        let mut best_score = f64::MIN;
        let mut best_created = chunks[group[0]].created_at;

        for &i in group {
            let chunk = &chunks[i];
            let age_days = (chunk.created_at - oldest).num_seconds().unsigned_abs() as f64 / 86_400.0;
            let age_bonus = 1.0 / (1.0 + age_days);
            let score = age_bonus
                + (chunk.content.chars().count() as f64 / 1000.0)
                + (chunk.metadata.len() as f64 / 10.0);

            if score > best_score
                || (score == best_score && chunk.created_at < best_created)
            {
                best_score = score;
                best_idx = i;
                best_created = chunk.created_at;
            }
        }

        best_idx
    }

    fn merge(
        &self,
        _tenant: &str,
        chunks: &[DocumentChunk],
        primary_idx: usize,
        duplicates: &[usize],
        pairs: &[Similarity],
    ) -> DedupDecision {
        let primary = &chunks[primary_idx];

        let mut merged_metadata: BTreeMap<String, Value> = primary.metadata.clone();
        for &dup_idx in duplicates {
            for (key, value) in &chunks[dup_idx].metadata {
                merged_metadata
                    .entry(key.clone())
                    .and_modify(|existing| {
                        if existing != value {
                            let mut list = match existing.take() {
                                Value::Array(items) => items,
                                other => vec![other],
                            };
                            if !list.contains(value) {
                                list.push(value.clone());
                            }
                            *existing = Value::Array(list);
                        }
                    })
                    .or_insert_with(|| value.clone());
            }
        }

        let sources: Vec<Value> = std::iter::once(primary.chunk_id.clone())
            .chain(duplicates.iter().map(|&i| chunks[i].chunk_id.clone()))
            .map(Value::String)
            .collect();
        merged_metadata.insert(
            "_deduplication".to_string(),
            serde_json::json!({
                "merged_at": Utc::now().to_rfc3339(),
                "sources": sources,
            }),
        );

        let min_similarity = duplicates
            .iter()
            .map(|&i| self.pair_similarity(pairs, primary_idx, i).sequence_score)
            .fold(f64::INFINITY, f64::min);

        let mut attribution = vec![SourceAttribution {
            chunk_id: primary.chunk_id.clone(),
            is_primary: true,
        }];
        attribution.extend(duplicates.iter().map(|&i| SourceAttribution {
            chunk_id: chunks[i].chunk_id.clone(),
            is_primary: false,
        }));

        DedupDecision {
            decision_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action: DedupAction::Merge,
            primary_chunk_id: primary.chunk_id.clone(),
            duplicate_chunk_ids: duplicates.iter().map(|&i| chunks[i].chunk_id.clone()).collect(),
            similarity_score: if min_similarity.is_finite() { min_similarity } else { 1.0 },
            reason: format!("{:?} strategy merge", self.strategy),
            merged_metadata,
            source_attribution: attribution,
        }
    }

    fn make_conflict(
        &self,
        tenant: &str,
        chunks: &[DocumentChunk],
        group: &[usize],
        conflict_type: ConflictType,
    ) -> ConflictCase {
        let scores: Vec<f64> = group
            .windows(2)
            .map(|w| sequence_similarity(&chunks[w[0]].content, &chunks[w[1]].content))
            .collect();
        let confidence = scores.iter().copied().fold(0.0_f64, f64::max);

        ConflictCase {
            case_id: Uuid::new_v4().to_string(),
            tenant: tenant.to_string(),
            chunk_ids: group.iter().map(|&i| chunks[i].chunk_id.clone()).collect(),
            similarity_scores: scores,
            conflict_type,
            suggested_action: match self.strategy {
                DedupStrategy::Manual => DedupAction::Preserve,
                _ => DedupAction::Merge,
            },
            confidence,
            created_at: Utc::now(),
            resolved: false,
            resolution_action: None,
            resolver: None,
            resolved_at: None,
        }
    }
}
