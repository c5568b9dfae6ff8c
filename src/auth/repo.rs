use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::OffsetDateTime;

use crate::auth::repo_types::{NewUser, RefreshTokenRecord, User};

#[derive(Debug, Error)]
pub enum RepoError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::UniqueViolation,
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Row-level access to users and refresh tokens. Every method is a single
/// atomic statement.
#[async_trait]
pub trait CredentialRepo: Send + Sync {
    async fn exists_by_nik_or_email(&self, nik: &str, email: &str) -> Result<bool, RepoError>;
    async fn insert_user(&self, user: NewUser<'_>) -> Result<User, RepoError>;
    async fn find_user_by_nik(&self, nik: &str) -> Result<Option<User>, RepoError>;
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, RepoError>;
    async fn insert_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), RepoError>;
    async fn find_refresh_token(&self, token: &str)
        -> Result<Option<RefreshTokenRecord>, RepoError>;
    async fn revoke_refresh_token(&self, token: &str) -> Result<(), RepoError>;
}

#[derive(Clone)]
pub struct PgCredentialRepo {
    db: PgPool,
}

impl PgCredentialRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialRepo for PgCredentialRepo {
    async fn exists_by_nik_or_email(&self, nik: &str, email: &str) -> Result<bool, RepoError> {
        let row: Option<(i64,)> =
            sqlx::query_as(r#"SELECT id FROM users WHERE nik = $1 OR email = $2 LIMIT 1"#)
                .bind(nik)
                .bind(email)
                .fetch_optional(&self.db)
                .await?;
        Ok(row.is_some())
    }

    async fn insert_user(&self, user: NewUser<'_>) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (nik, nama, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, nik, nama, email, password_hash, created_at
            "#,
        )
        .bind(user.nik)
        .bind(user.nama)
        .bind(user.email)
        .bind(user.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_nik(&self, nik: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, nik, nama, email, password_hash, created_at
            FROM users
            WHERE nik = $1
            "#,
        )
        .bind(nik)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, nik, nama, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, RepoError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, token, expires_at, revoked, created_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(record)
    }

    async fn revoke_refresh_token(&self, token: &str) -> Result<(), RepoError> {
        sqlx::query(r#"UPDATE refresh_tokens SET revoked = TRUE WHERE token = $1"#)
            .bind(token)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
