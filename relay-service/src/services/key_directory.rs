//! Durable mapping from username to current public key.

use crate::error::AppError;
use crate::models::User;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub struct KeyDirectory;

impl KeyDirectory {
    pub async fn find_user(
        db: &Pool<Postgres>,
        username: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, public_key, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create the user record on first authentication.
    pub async fn create(
        db: &Pool<Postgres>,
        username: &str,
        public_key: &str,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, public_key) VALUES ($1, $2, $3) \
             RETURNING id, username, public_key, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(public_key)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Replace the stored public key unconditionally.
    ///
    /// Overwrite is not gated by proof of possession of the previous private
    /// key: any caller who can authenticate the username can replace its key.
    /// That window is part of the service's stated trust model.
    pub async fn overwrite_key(
        db: &Pool<Postgres>,
        username: &str,
        public_key: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET public_key = $1 WHERE username = $2")
            .bind(public_key)
            .bind(username)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Current public key for `username`, or `NotFound`.
    pub async fn lookup(db: &Pool<Postgres>, username: &str) -> Result<String, AppError> {
        let key: Option<String> =
            sqlx::query_scalar("SELECT public_key FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(db)
                .await?;
        key.ok_or(AppError::NotFound)
    }
}
