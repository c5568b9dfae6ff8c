//! Session lifecycle: register, login, verify, refresh, logout.
//!
//! All session state lives in the credential store; nothing here is kept in
//! memory between requests.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::auth::jwt::TokenAuthority;
use crate::auth::repo_types::User;
use crate::auth::services::{CredentialStore, StoreError};
use crate::error::AppError;

/// Identity of the caller behind a verified access token. Handlers receive it
/// as a typed value; it never travels through request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i64,
    pub nik: String,
    pub nama: String,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct SessionProtocol {
    store: CredentialStore,
    tokens: Arc<TokenAuthority>,
}

fn invalid_credentials() -> AppError {
    AppError::Authentication("Invalid credentials".into())
}

impl SessionProtocol {
    pub fn new(store: CredentialStore, tokens: Arc<TokenAuthority>) -> Self {
        Self { store, tokens }
    }

    /// Creates the account. The caller stays anonymous until it logs in.
    pub async fn register(
        &self,
        nik: &str,
        nama: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let user = self
            .store
            .create_user(nik, nama, email, password)
            .await
            .map_err(|e| {
                if matches!(e, StoreError::Conflict) {
                    warn!("registration rejected: nik or email taken");
                }
                AppError::from(e)
            })?;
        info!(user_id = user.id, "warga registered");
        Ok(user)
    }

    /// Issues an access/refresh pair. The refresh token is recorded before it
    /// is returned; if that write fails the login fails.
    pub async fn login(&self, nik: &str, password: &str) -> Result<LoginOutcome, AppError> {
        if nik.is_empty() || password.is_empty() {
            return Err(AppError::Validation("NIK and password are required".into()));
        }

        let user = match self.store.verify_credentials(nik, password).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                warn!("login failed: unknown nik");
                return Err(invalid_credentials());
            }
            Err(StoreError::BadPassword) => {
                warn!("login failed: bad password");
                return Err(invalid_credentials());
            }
            Err(e) => return Err(e.into()),
        };

        let access_token = self.tokens.issue_access_token(user.id, &user.nik, &user.nama)?;
        let (refresh_token, expires_at) = self.tokens.issue_refresh_token(user.id)?;
        self.store
            .record_refresh_token(user.id, &refresh_token, expires_at)
            .await?;

        info!(user_id = user.id, "warga logged in");
        Ok(LoginOutcome {
            access_token,
            refresh_token,
            user,
        })
    }

    /// Checks an access token and that its user still exists.
    pub async fn verify(&self, access_token: &str) -> Result<(AuthContext, User), AppError> {
        let claims = self.tokens.verify_access(access_token).map_err(|e| {
            warn!(error = %e, "access token rejected");
            AppError::from(e)
        })?;

        let user = match self.store.find_user_by_id(claims.user_id).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                warn!(user_id = claims.user_id, "token for missing user");
                return Err(AppError::NotFound("User not found".into()));
            }
            Err(e) => return Err(e.into()),
        };

        let ctx = AuthContext {
            user_id: user.id,
            nik: user.nik.clone(),
            nama: user.nama.clone(),
        };
        Ok((ctx, user))
    }

    /// Re-authentication for sensitive actions. Issues no tokens.
    pub async fn verify_password(&self, ctx: &AuthContext, password: &str) -> Result<(), AppError> {
        if password.is_empty() {
            return Err(AppError::Validation("Password is required".into()));
        }
        match self.store.verify_credentials(&ctx.nik, password).await {
            Ok(user) if user.id == ctx.user_id => {
                info!(user_id = ctx.user_id, "password re-verified");
                Ok(())
            }
            Ok(_) | Err(StoreError::NotFound) | Err(StoreError::BadPassword) => {
                warn!(user_id = ctx.user_id, "password re-verification failed");
                Err(invalid_credentials())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Mints a new access token. The refresh token itself is not rotated.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, AppError> {
        if refresh_token.is_empty() {
            return Err(AppError::Validation("Refresh token is required".into()));
        }

        let claims = self.tokens.verify_refresh(refresh_token).map_err(|e| {
            warn!(error = %e, "refresh token rejected");
            AppError::Authentication("Invalid refresh token".into())
        })?;

        let state = match self.store.lookup_refresh_token(refresh_token).await {
            Ok(state) => state,
            Err(StoreError::NotFound) => {
                warn!(user_id = claims.user_id, "refresh token not on record");
                return Err(AppError::Authentication(
                    "Invalid or expired refresh token".into(),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        if !state.is_usable_at(OffsetDateTime::now_utc()) || state.user_id != claims.user_id {
            warn!(
                user_id = claims.user_id,
                revoked = state.revoked,
                "refresh token no longer usable"
            );
            return Err(AppError::Authentication(
                "Invalid or expired refresh token".into(),
            ));
        }

        let user = match self.store.find_user_by_id(claims.user_id).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Err(AppError::NotFound("User not found".into())),
            Err(e) => return Err(e.into()),
        };

        let access_token = self.tokens.issue_access_token(user.id, &user.nik, &user.nama)?;
        info!(user_id = user.id, "access token refreshed");
        Ok(RefreshOutcome { access_token, user })
    }

    /// Revokes the refresh token. Access tokens already issued stay valid until
    /// their own expiry.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        if refresh_token.is_empty() {
            return Err(AppError::Validation("Refresh token is required".into()));
        }
        self.store.revoke_refresh_token(refresh_token).await?;
        info!("refresh token revoked");
        Ok(())
    }
}
