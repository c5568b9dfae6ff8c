use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the credential database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,                    // opaque identity
    pub nik: String,                // 16-digit national ID, unique
    pub nama: String,               // display name
    pub email: String,              // unique
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 PHC string, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields needed to insert a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub nik: &'a str,
    pub nama: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

/// Server-side state of an issued refresh token. Rows are never deleted.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: OffsetDateTime,
    pub revoked: bool,
    pub created_at: OffsetDateTime,
}
