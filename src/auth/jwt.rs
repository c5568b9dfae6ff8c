use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::auth::claims::{AccessClaims, RefreshClaims, Role, TokenClaims, TokenKind};
use crate::config::JwtConfig;
use crate::error::AppError;

/// Only HS256 is accepted. The algorithm named in a token header is never trusted.
const PINNED_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    SignatureInvalid,
    #[error("token expired")]
    Expired,
    #[error("unexpected signing algorithm")]
    WrongAlgorithm,
    #[error("unexpected role {0:?}")]
    UnexpectedRole(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Authentication("Token expired".into()),
            TokenError::UnexpectedRole(_) => {
                AppError::Authorization("Access denied. Warga only.".into())
            }
            TokenError::Signing(e) => AppError::Crypto(e),
            TokenError::Malformed | TokenError::SignatureInvalid | TokenError::WrongAlgorithm => {
                AppError::Authentication("Invalid token".into())
            }
        }
    }
}

/// One signing domain: a secret plus its expiry policy.
#[derive(Clone)]
pub struct SigningDomain {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningDomain {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Issues and verifies access and refresh tokens.
///
/// The refresh domain is optional: services that only consume access tokens
/// are never handed the refresh secret.
#[derive(Clone)]
pub struct TokenAuthority {
    access: SigningDomain,
    refresh: Option<SigningDomain>,
}

#[derive(Deserialize)]
struct RoleProbe {
    role: String,
}

impl TokenAuthority {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            access: SigningDomain::new(&cfg.access_secret, cfg.access_ttl),
            refresh: Some(SigningDomain::new(&cfg.refresh_secret, cfg.refresh_ttl)),
        }
    }

    /// Verifier for a service that only checks access tokens.
    pub fn access_only(access_secret: &str) -> Self {
        Self {
            access: SigningDomain::new(access_secret, Duration::ZERO),
            refresh: None,
        }
    }

    pub fn issue_access_token(
        &self,
        user_id: i64,
        nik: &str,
        nama: &str,
    ) -> Result<String, TokenError> {
        let (iat, exp) = window(self.access.ttl);
        let claims = AccessClaims {
            user_id,
            nik: nik.to_string(),
            nama: nama.to_string(),
            role: Role::Citizen,
            iat,
            exp,
            kind: TokenKind::Access,
        };
        sign(&claims, &self.access)
    }

    /// Returns the signed refresh token and its absolute expiry.
    pub fn issue_refresh_token(
        &self,
        user_id: i64,
    ) -> Result<(String, OffsetDateTime), TokenError> {
        let domain = self
            .refresh
            .as_ref()
            .ok_or_else(|| TokenError::Signing("refresh secret not configured".into()))?;
        let (iat, exp) = window(domain.ttl);
        let claims = RefreshClaims {
            user_id,
            jti: nonce(),
            iat,
            exp,
            kind: TokenKind::Refresh,
        };
        let token = sign(&claims, domain)?;
        let expires_at =
            OffsetDateTime::from_unix_timestamp(exp).map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok((token, expires_at))
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        match verify::<AccessClaims>(token, &self.access) {
            Err(TokenError::Malformed) => {
                // Signature was fine but the payload did not fit. A foreign role
                // is reported separately so callers can answer 403.
                match decode::<RoleProbe>(token, &self.access.decoding, &validation()) {
                    Ok(probe) if probe.claims.role != Role::Citizen.as_str() => {
                        Err(TokenError::UnexpectedRole(probe.claims.role))
                    }
                    _ => Err(TokenError::Malformed),
                }
            }
            other => other,
        }
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let domain = self.refresh.as_ref().ok_or(TokenError::SignatureInvalid)?;
        verify::<RefreshClaims>(token, domain)
    }
}

fn nonce() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

fn window(ttl: Duration) -> (i64, i64) {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    (now, now.saturating_add(ttl))
}

fn sign<C: TokenClaims>(claims: &C, domain: &SigningDomain) -> Result<String, TokenError> {
    let token = encode(&Header::new(PINNED_ALGORITHM), claims, &domain.encoding)
        .map_err(|e| TokenError::Signing(e.to_string()))?;
    debug!(kind = ?C::KIND, "jwt signed");
    Ok(token)
}

fn validation() -> Validation {
    let mut validation = Validation::new(PINNED_ALGORITHM);
    validation.leeway = 0;
    validation.validate_aud = false;
    validation.required_spec_claims = ["exp".to_string()].into_iter().collect();
    validation
}

fn verify<C: TokenClaims>(token: &str, domain: &SigningDomain) -> Result<C, TokenError> {
    let data = decode::<C>(token, &domain.decoding, &validation()).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::WrongAlgorithm
        }
        _ => TokenError::Malformed,
    })?;
    let claims = data.claims;
    if claims.kind() != C::KIND {
        return Err(TokenError::Malformed);
    }
    // Usable only while now < exp; the library accepts exp == now.
    if OffsetDateTime::now_utc().unix_timestamp() >= claims.expires_at() {
        return Err(TokenError::Expired);
    }
    debug!(kind = ?C::KIND, "jwt verified");
    Ok(claims)
}
