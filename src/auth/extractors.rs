use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::auth::repo_types::User;
use crate::auth::session::{AuthContext, SessionProtocol};
use crate::error::AppError;

/// Verified caller of a protected endpoint. Works in any service whose state
/// can hand out a [`SessionProtocol`].
pub struct AuthUser {
    pub ctx: AuthContext,
    pub user: User,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionProtocol: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Expect "Bearer <token>"
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Authentication("No token provided".into()))?;

        let protocol = SessionProtocol::from_ref(state);
        let (ctx, user) = protocol.verify(token).await?;
        Ok(AuthUser { ctx, user })
    }
}
