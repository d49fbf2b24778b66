//! Content similarity functions.
//!
//! Two distinct notions of "similarity" are computed for every pair: a
//! longest-common-subsequence-style sequence ratio (used by merge threshold logic) and
//! a Jaccard word-overlap ratio (reported but not used for the merge decision).

use std::collections::BTreeSet;
use std::collections::BTreeMap;

use serde_json::Value;

use super::types::CRITICAL_METADATA_FIELDS;

/// Collapses whitespace and lowercases, mirroring [`crate::hashing::normalize_text`]
/// but kept local so dedup's normalization policy can diverge from the cache's if
/// that's ever decided differently per field.
pub fn normalize_content(text: &str) -> String {
    crate::hashing::normalize_text(text)
}

/// Length of the longest common subsequence between two strings, over `char`s.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return 0;
    }
    let mut prev = vec![0usize; m + 1];
    let mut curr = vec![0usize; m + 1];
    for i in 1..=n {
        for j in 1..=m {
            curr[j] = if a[i - 1] == b[j - 1] {
                prev[j - 1] + 1
            } else {
                prev[j].max(curr[j - 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[m]
}

/// LCS-ratio sequence similarity on normalized content, in `[0, 1]`.
///
/// Defined as `2 * lcs_len / (len_a + len_b)`, the standard sequence-match ratio; two
/// empty strings are defined as identical (`1.0`).
pub fn sequence_similarity(a: &str, b: &str) -> f64 {
    let na = normalize_content(a);
    let nb = normalize_content(b);
    let ca: Vec<char> = na.chars().collect();
    let cb: Vec<char> = nb.chars().collect();
    if ca.is_empty() && cb.is_empty() {
        return 1.0;
    }
    let total = ca.len() + cb.len();
    if total == 0 {
        return 1.0;
    }
    let lcs = lcs_len(&ca, &cb);
    (2.0 * lcs as f64) / total as f64
}

/// Jaccard ratio over normalized word sets, in `[0, 1]`.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let na = normalize_content(a);
    let nb = normalize_content(b);
    let wa: BTreeSet<&str> = na.split_whitespace().collect();
    let wb: BTreeSet<&str> = nb.split_whitespace().collect();
    if wa.is_empty() && wb.is_empty() {
        return 1.0;
    }
    let intersection = wa.intersection(&wb).count();
    let union = wa.union(&wb).count();
    if union == 0 {
        return 1.0;
    }
    intersection as f64 / union as f64
}

/// Returns `true` unless any critical metadata field present on *both* chunks
/// disagrees between them.
pub fn metadata_compatible(
    a: &BTreeMap<String, Value>,
    b: &BTreeMap<String, Value>,
) -> bool {
    for field in CRITICAL_METADATA_FIELDS {
        if let (Some(va), Some(vb)) = (a.get(*field), b.get(*field)) {
            if va != vb {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_text_scores_one() {
        assert_eq!(sequence_similarity("The quick brown fox.", "The quick brown fox."), 1.0);
    }

    #[test]
    fn case_and_whitespace_insensitive() {
        let a = "The quick brown fox.";
        let b = "the   quick BROWN fox.";
        assert_eq!(sequence_similarity(a, b), 1.0);
    }

    #[test]
    fn trailing_punctuation_reduces_but_keeps_high_similarity() {
        let a = "the quick brown fox";
        let b = "the quick brown fox!";
        let score = sequence_similarity(a, b);
        assert!(score > 0.95 && score < 1.0, "score was {score}");
    }

    #[test]
    fn unrelated_text_scores_low() {
        let score = sequence_similarity("completely different content here", "xyz abc qwerty");
        assert!(score < 0.3, "score was {score}");
    }

    #[test]
    fn jaccard_ignores_word_order() {
        let a = jaccard_similarity("red green blue", "blue green red");
        assert_eq!(a, 1.0);
    }

    #[test]
    fn metadata_compatible_when_no_overlap() {
        let a = BTreeMap::new();
        let b: BTreeMap<String, Value> = [("page".to_string(), json!(1))].into_iter().collect();
        assert!(metadata_compatible(&a, &b));
    }

    #[test]
    fn metadata_incompatible_on_page_disagreement() {
        let a: BTreeMap<String, Value> = [("page".to_string(), json!(1))].into_iter().collect();
        let b: BTreeMap<String, Value> = [("page".to_string(), json!(2))].into_iter().collect();
        assert!(!metadata_compatible(&a, &b));
    }

    #[test]
    fn metadata_compatible_on_non_critical_disagreement() {
        let a: BTreeMap<String, Value> =
            [("author".to_string(), json!("alice"))].into_iter().collect();
        let b: BTreeMap<String, Value> =
            [("author".to_string(), json!("bob"))].into_iter().collect();
        assert!(metadata_compatible(&a, &b));
    }
}
