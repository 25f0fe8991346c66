//! Account password rules and the Argon2 hashing behind them.
//!
//! Every path that accepts a new password goes through [`validate`] before
//! [`hash`]; every login-style check goes through [`matches`], or
//! [`match_unknown_account`] when there is no stored hash to compare with.

use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;

use crate::users::{UserError, ValidationError};

pub const MIN_LEN: usize = 8;

/// Length and confirmation rules for a new password.
pub fn validate(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

pub fn hash(plain: &str) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| UserError::Unexpected(anyhow!("hash password: {}", e)))
}

/// Compares a candidate with a stored PHC string. A stored value that does
/// not parse is a data error, not a mismatch.
pub fn matches(candidate: &str, stored: &str) -> Result<bool, UserError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| UserError::Unexpected(anyhow!("stored password hash unreadable: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok())
}

lazy_static! {
    static ref UNKNOWN_ACCOUNT_HASH: Option<String> = hash("authgate-unknown-account").ok();
}

/// Spends the same Argon2 work as [`matches`] for an email with no account,
/// so login latency does not reveal which addresses are registered.
pub fn match_unknown_account(candidate: &str) {
    if let Some(stored) = UNKNOWN_ACCOUNT_HASH.as_deref() {
        let _ = matches(candidate, stored);
    }
}
