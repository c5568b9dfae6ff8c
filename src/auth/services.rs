//! Credential store: the only writer of password hashes and revocation flags.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, error};

use crate::auth::password::{hash_password, verify_dummy, verify_password};
use crate::auth::repo::{CredentialRepo, RepoError};
use crate::auth::repo_types::{NewUser, User};
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Invalid(String),
    #[error("nik or email already exists")]
    Conflict,
    #[error("not found")]
    NotFound,
    #[error("bad password")]
    BadPassword,
    #[error("hashing failure: {0}")]
    Hashing(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<RepoError> for StoreError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::UniqueViolation => StoreError::Conflict,
            RepoError::Database(e) => StoreError::Storage(e),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Invalid(msg) => AppError::Validation(msg),
            StoreError::Conflict => AppError::Conflict("NIK or email already exists".into()),
            StoreError::NotFound => AppError::NotFound("User not found".into()),
            StoreError::BadPassword => AppError::Authentication("Invalid credentials".into()),
            StoreError::Hashing(e) => AppError::Crypto(e),
            StoreError::Storage(e) => AppError::Storage(e),
        }
    }
}

/// Server-side view of a refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenState {
    pub revoked: bool,
    pub expires_at: OffsetDateTime,
    pub user_id: i64,
}

impl RefreshTokenState {
    pub fn is_usable_at(&self, now: OffsetDateTime) -> bool {
        !self.revoked && now < self.expires_at
    }
}

pub(crate) fn is_valid_nik(nik: &str) -> bool {
    lazy_static! {
        static ref NIK_RE: Regex = Regex::new(r"^[0-9]{16}$").unwrap();
    }
    NIK_RE.is_match(nik)
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[derive(Clone)]
pub struct CredentialStore {
    repo: Arc<dyn CredentialRepo>,
}

impl CredentialStore {
    pub fn new(repo: Arc<dyn CredentialRepo>) -> Self {
        Self { repo }
    }

    pub async fn create_user(
        &self,
        nik: &str,
        nama: &str,
        email: &str,
        password: &str,
    ) -> Result<User, StoreError> {
        if nik.is_empty() || nama.is_empty() || email.is_empty() || password.is_empty() {
            return Err(StoreError::Invalid(
                "NIK, nama, email, and password are required".into(),
            ));
        }
        if !is_valid_nik(nik) {
            return Err(StoreError::Invalid("NIK must be exactly 16 digits".into()));
        }
        if !is_valid_email(email) {
            return Err(StoreError::Invalid("Invalid email".into()));
        }

        // Fast path only; the insert's unique constraint is what actually decides.
        if self.repo.exists_by_nik_or_email(nik, email).await? {
            return Err(StoreError::Conflict);
        }

        let hash = hash_blocking(password.to_string()).await?;
        let user = self
            .repo
            .insert_user(NewUser {
                nik,
                nama,
                email,
                password_hash: &hash,
            })
            .await?;
        debug!(user_id = user.id, "user created");
        Ok(user)
    }

    /// Unknown users still pay for one hash comparison, so timing does not
    /// reveal which check failed.
    pub async fn verify_credentials(&self, nik: &str, password: &str) -> Result<User, StoreError> {
        let user = self.repo.find_user_by_nik(nik).await?;
        let password = password.to_string();
        match user {
            Some(user) => {
                let hash = user.password_hash.clone();
                let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
                    .await
                    .map_err(|e| StoreError::Hashing(e.to_string()))?
                    .map_err(|e| StoreError::Hashing(e.to_string()))?;
                if ok {
                    Ok(user)
                } else {
                    Err(StoreError::BadPassword)
                }
            }
            None => {
                tokio::task::spawn_blocking(move || verify_dummy(&password))
                    .await
                    .map_err(|e| StoreError::Hashing(e.to_string()))?;
                Err(StoreError::NotFound)
            }
        }
    }

    pub async fn record_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.repo
            .insert_refresh_token(user_id, token, expires_at)
            .await
            .map_err(|e| {
                error!(error = %e, user_id, "refresh token insert failed");
                StoreError::Storage(e.to_string())
            })
    }

    pub async fn lookup_refresh_token(&self, token: &str) -> Result<RefreshTokenState, StoreError> {
        let record = self
            .repo
            .find_refresh_token(token)
            .await?
            .ok_or(StoreError::NotFound)?;
        Ok(RefreshTokenState {
            revoked: record.revoked,
            expires_at: record.expires_at,
            user_id: record.user_id,
        })
    }

    /// Idempotent: unknown and already-revoked tokens are not errors here.
    pub async fn revoke_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        self.repo.revoke_refresh_token(token).await?;
        Ok(())
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<User, StoreError> {
        self.repo
            .find_user_by_id(id)
            .await?
            .ok_or(StoreError::NotFound)
    }
}

async fn hash_blocking(password: String) -> Result<String, StoreError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| StoreError::Hashing(e.to_string()))?
        .map_err(|e| StoreError::Hashing(e.to_string()))
}
