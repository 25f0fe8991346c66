//! One-time password reset tokens.
//!
//! The plaintext is 32 random bytes, hex encoded, and is only ever emailed.
//! The database keeps the hex SHA-256 of it, so a leaked table cannot be used
//! to redeem resets.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// Returns `(plaintext, hash)`.
pub fn generate() -> (String, String) {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let plain = hex::encode(bytes);
    let hashed = hash(&plain);
    (plain, hashed)
}

pub fn hash(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}
