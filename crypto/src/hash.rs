//! SHA-256 hashing.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of arbitrary data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Lowercase hex SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// The first `len` hex characters of the SHA-256 digest (capped at 64).
pub fn truncated_hex_digest(data: &[u8], len: usize) -> String {
    let mut digest = sha256_hex(data);
    digest.truncate(len.min(64));
    digest
}
