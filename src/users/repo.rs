use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::model::{NewUser, User, UserError};

/// Persistence for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, new_user: NewUser) -> Result<User, UserError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;
    /// Only matches tokens whose expiry is still after `now`.
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, UserError>;
    async fn list(&self) -> Result<Vec<User>, UserError>;
    async fn save(&self, user: &User) -> Result<(), UserError>;
}

const USER_COLUMNS: &str = "id, name, email, role, password_hash, password_changed_at, \
                            password_reset_token, password_reset_expires, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, UserError> {
        let sql = format!(
            "INSERT INTO users (id, name, email, role, password_hash, password_changed_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(new_user.id)
            .bind(&new_user.name)
            .bind(&new_user.email)
            .bind(new_user.role)
            .bind(&new_user.password_hash)
            .bind(new_user.password_changed_at)
            .fetch_one(&self.db)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    UserError::DuplicateEmail
                }
                e => UserError::Unexpected(anyhow::Error::new(e).context("insert user")),
            })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, UserError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE password_reset_token = $1 AND password_reset_expires > $2"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.db)
            .await
            .context("find user by reset token")?;
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<User>, UserError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list users")?;
        Ok(users)
    }

    async fn save(&self, user: &User) -> Result<(), UserError> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = $2,
                email = $3,
                role = $4,
                password_hash = $5,
                password_changed_at = $6,
                password_reset_token = $7,
                password_reset_expires = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(&user.password_hash)
        .bind(user.password_changed_at)
        .bind(&user.password_reset_token)
        .bind(user.password_reset_expires)
        .execute(&self.db)
        .await
        .context("save user")?;
        Ok(())
    }
}
