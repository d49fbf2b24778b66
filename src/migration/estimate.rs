//! Migration time estimation.

const T_EMBED_SECS: f64 = 0.5;
const T_STORE_SECS: f64 = 0.1;
const BATCH_OVERHEAD_SECS: f64 = 2.0;
const SAFETY_FACTOR: f64 = 1.5;

/// A chunk/batch/seconds estimate, with a human-readable rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationEstimate {
    /// Chunk count the estimate is based on.
    pub chunks: u64,
    /// Batch count at the given batch size.
    pub batches: u64,
    /// Estimated wall-clock seconds.
    pub seconds: f64,
    /// Human-readable rendering, e.g. `"2m 30s"`.
    pub human: String,
}

/// Estimates migration duration: `1.5 × (chunks × (t_embed + t_store) + batches ×
/// batch_overhead)`.
pub fn estimate(chunks: u64, batch_size: u64) -> MigrationEstimate {
    let batch_size = batch_size.max(1);
    let batches = chunks.div_ceil(batch_size);
    let seconds = SAFETY_FACTOR
        * (chunks as f64 * (T_EMBED_SECS + T_STORE_SECS) + batches as f64 * BATCH_OVERHEAD_SECS);

    MigrationEstimate {
        chunks,
        batches,
        seconds,
        human: human_duration(seconds),
    }
}

fn human_duration(seconds: f64) -> String {
    let total = seconds.round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_round_up() {
        let est = estimate(150, 50);
        assert_eq!(est.batches, 3);
    }

    #[test]
    fn partial_final_batch_still_rounds_up() {
        let est = estimate(151, 50);
        assert_eq!(est.batches, 4);
    }

    #[test]
    fn zero_chunks_is_zero_seconds() {
        let est = estimate(0, 50);
        assert_eq!(est.seconds, 0.0);
        assert_eq!(est.human, "0s");
    }

    #[test]
    fn human_rendering_picks_largest_unit() {
        assert_eq!(human_duration(45.0), "45s");
        assert_eq!(human_duration(125.0), "2m 5s");
        assert_eq!(human_duration(3725.0), "1h 2m");
    }
}
