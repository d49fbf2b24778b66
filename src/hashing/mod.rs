//! Cache key derivation and content fingerprinting.
//!
//! Two distinct hash algorithms are used deliberately, not interchangeably:
//!
//! - [`cache_key`] uses SHA-256 because the cache key algorithm is a stated, testable
//!   design decision: it must be stable across processes, and changing it
//!   is a breaking, cache-invalidating change. Pinning a specific, named algorithm makes
//!   that contract auditable.
//! - [`fingerprint`] uses BLAKE3 for internal content fingerprinting (dedup candidate
//!   identity, audit record ids) where only determinism and speed matter, not a
//!   specific named algorithm.

use sha2::{Digest, Sha256};

/// Collapses whitespace runs to single spaces, trims ends, lowercases.
///
/// This is the single normalization policy for cache keys; it must be applied
/// identically on read and write. Differently-cased or
/// differently-spaced inputs that normalize to the same string collide by design.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        }
    }
    out
}

/// Derives the content-addressed cache key for `(text, provider, model)`.
///
/// `key = SHA-256(normalize(text) || '|' || provider || '|' || model)`. Pure function
/// of its inputs: concurrent `put`s of the same key are therefore idempotent.
pub fn cache_key(text: &str, provider: &str, model: &str) -> String {
    let normalized = normalize_text(text);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hasher.update(b"|");
    hasher.update(provider.as_bytes());
    hasher.update(b"|");
    hasher.update(model.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// 256-bit BLAKE3 fingerprint of arbitrary content (dedup identity, audit ids).
pub fn fingerprint(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// 64-bit BLAKE3 fingerprint, truncated from the 256-bit digest.
///
/// Acceptable for fast indexing (dedup graph node ids); a collision degrades to a
/// spurious similarity edge, never silent data loss, so the truncation carries no
/// correctness burden.
pub fn fingerprint_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8].try_into().expect("blake3 >= 8 bytes");
    u64::from_le_bytes(bytes)
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        use std::fmt::Write;
        let mut out = String::with_capacity(bytes.as_ref().len() * 2);
        for byte in bytes.as_ref() {
            write!(out, "{byte:02x}").expect("writing to String cannot fail");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_lowercases() {
        assert_eq!(normalize_text("  Hello   WORLD "), "hello world");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_text("  Hello   WORLD ");
        let twice = normalize_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn cache_key_determinism() {
        let a = cache_key("Foo", "A", "M1");
        let b = cache_key("Foo", "A", "M1");
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_normalization_collision() {
        // S2: differently-cased/spaced text that normalizes the same must collide.
        let a = cache_key("  Hello   WORLD ", "A", "M1");
        let b = cache_key("hello world", "A", "M1");
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_sensitive_to_provider_and_model() {
        let base = cache_key("hello", "A", "M1");
        assert_ne!(base, cache_key("hello", "B", "M1"));
        assert_ne!(base, cache_key("hello", "A", "M2"));
    }

    #[test]
    fn cache_key_separator_prevents_field_smearing() {
        // Without a separator "a" + "bc" would equal "ab" + "c".
        let a = cache_key("x", "ab", "c");
        let b = cache_key("x", "a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn cache_key_is_hex_sha256_length() {
        let key = cache_key("hello", "A", "M1");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_determinism() {
        assert_eq!(fingerprint(b"abc"), fingerprint(b"abc"));
        assert_ne!(fingerprint(b"abc"), fingerprint(b"abd"));
    }

    #[test]
    fn fingerprint_u64_determinism() {
        assert_eq!(fingerprint_u64(b"tenant-1"), fingerprint_u64(b"tenant-1"));
    }
}
