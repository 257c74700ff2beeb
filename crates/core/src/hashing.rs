//! Shared SHA-256 helpers used for cache keys.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Build a cache key from ordered parts.
///
/// Parts are joined with a `|||` separator before hashing so that
/// `("ab", "c")` and `("a", "bc")` never collide. The digest is truncated
/// to 32 hex characters, which is plenty for a local cache.
pub fn cache_key(parts: &[&str]) -> String {
    let joined = parts.join("|||");
    let mut hex = sha256_hex(joined.as_bytes());
    hex.truncate(32);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_known_hash() {
        let hash = sha256_hex(b"");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn cache_key_is_stable_and_truncated() {
        let a = cache_key(&["model", "system", "user"]);
        let b = cache_key(&["model", "system", "user"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn cache_key_separates_parts() {
        assert_ne!(cache_key(&["ab", "c"]), cache_key(&["a", "bc"]));
    }
}
