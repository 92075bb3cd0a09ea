//! Salted password digest.
//!
//! `hash = hex(SHA-256(salt_bytes || utf8(password)))`, one round. The salt
//! is 16 random bytes stored hex-encoded. This matches the records written
//! by the original catalog app, so the scheme must stay as it is for
//! existing rows to verify.

use sha2::{Digest, Sha256};

/// Salt byte length before hex encoding (16 bytes = 32 hex chars).
pub const SALT_BYTES: usize = 16;

/// Session id byte length before hex encoding (32 bytes = 64 hex chars).
const TOKEN_BYTES: usize = 32;

/// Generate a fresh random salt.
pub fn generate_salt() -> [u8; SALT_BYTES] {
    rand::random()
}

/// Generate an opaque random token (hex-encoded).
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    hex::encode(bytes)
}

/// Digest `salt || password`, hex-encoded.
pub fn hash_password(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check `password` against a stored hex salt and hex hash.
///
/// A malformed stored salt never verifies.
pub fn verify_password(password: &str, salt_hex: &str, expected_hash: &str) -> bool {
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let attempt = hash_password(&salt, password);
    constant_time_eq(attempt.as_bytes(), expected_hash.to_ascii_lowercase().as_bytes())
}

/// Constant-time byte comparison to prevent timing attacks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
