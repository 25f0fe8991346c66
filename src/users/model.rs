use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::error::error_chain_fmt;
use crate::users::{password, reset_token};

/// Access level of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "user_role", rename_all = "kebab-case")]
pub enum Role {
    #[default]
    User,
    Guide,
    LeadGuide,
    Admin,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub password_changed_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>, // sha256 of the emailed token
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please tell us your name!")]
    MissingName,
    #[error("Please provide a valid email")]
    InvalidEmail,
    #[error("Password must have at least 8 characters")]
    PasswordTooShort,
    #[error("Passwords are not the same!")]
    PasswordMismatch,
}

#[derive(thiserror::Error)]
pub enum UserError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl std::fmt::Debug for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A validated signup, ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub password_changed_at: Option<OffsetDateTime>,
}

impl NewUser {
    pub fn parse(
        name: &str,
        email: &str,
        password: &str,
        password_confirm: &str,
        password_changed_at: Option<OffsetDateTime>,
    ) -> Result<Self, UserError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName.into());
        }
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail.into());
        }
        password::validate(password, password_confirm)?;

        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            role: Role::default(),
            password_hash: password::hash(password)?,
            password_changed_at,
        })
    }
}

impl User {
    /// Constant-time check of a candidate against the stored hash.
    pub fn correct_password(&self, candidate: &str) -> Result<bool, UserError> {
        password::matches(candidate, &self.password_hash)
    }

    /// Validates, hashes and stores a new password.
    ///
    /// The change is recorded one second in the past so a token signed right
    /// after the change is not rejected by `changed_password_after`.
    pub fn set_password(
        &mut self,
        password: &str,
        password_confirm: &str,
        now: OffsetDateTime,
    ) -> Result<(), UserError> {
        password::validate(password, password_confirm)?;
        self.password_hash = password::hash(password)?;
        self.password_changed_at = Some(now - Duration::seconds(1));
        Ok(())
    }

    /// True when the password was changed after a token issued at `iat`
    /// (unix seconds).
    pub fn changed_password_after(&self, iat: i64) -> bool {
        self.password_changed_at
            .map(|changed| changed.unix_timestamp() > iat)
            .unwrap_or(false)
    }

    /// Stores the hash of a fresh reset token and returns the plaintext,
    /// which must only ever leave through the reset email.
    pub fn create_password_reset_token(&mut self, ttl: Duration, now: OffsetDateTime) -> String {
        let (plain, hashed) = reset_token::generate();
        self.password_reset_token = Some(hashed);
        self.password_reset_expires = Some(now + ttl);
        plain
    }

    pub fn clear_password_reset_token(&mut self) {
        self.password_reset_token = None;
        self.password_reset_expires = None;
    }
}

#[cfg(test)]
pub(crate) fn sample_user(email: &str, password: &str, role: Role) -> User {
    User {
        id: Uuid::new_v4(),
        name: "Sample".into(),
        email: email.into(),
        role,
        password_hash: password::hash(password).expect("hash"),
        password_changed_at: None,
        password_reset_token: None,
        password_reset_expires: None,
        created_at: OffsetDateTime::now_utc(),
    }
}
