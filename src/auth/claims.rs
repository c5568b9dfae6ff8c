use serde::{Deserialize, Serialize};

/// Which signing domain a token belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn access() -> Self {
        TokenKind::Access
    }
}

/// Authorization level carried in access tokens. Citizens ("warga") are the only
/// role this core issues or accepts; unknown values fail to deserialize.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "warga")]
    Citizen,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "warga",
        }
    }
}

/// Access token payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub nik: String,
    pub nama: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    /// Absent in tokens minted before the claim existed; those are access tokens.
    #[serde(default = "TokenKind::access")]
    pub kind: TokenKind,
}

/// Refresh token payload. Carries no identity fields, so every refresh has to
/// go back to the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Random nonce; two logins in the same second still get distinct tokens.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub kind: TokenKind,
}

/// Either claim set, so the token authority can verify both with one code path.
pub trait TokenClaims: Serialize + for<'de> Deserialize<'de> {
    const KIND: TokenKind;

    fn kind(&self) -> TokenKind;
    fn expires_at(&self) -> i64;
}

impl TokenClaims for AccessClaims {
    const KIND: TokenKind = TokenKind::Access;

    fn kind(&self) -> TokenKind {
        self.kind
    }
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl TokenClaims for RefreshClaims {
    const KIND: TokenKind = TokenKind::Refresh;

    fn kind(&self) -> TokenKind {
        self.kind
    }
    fn expires_at(&self) -> i64 {
        self.exp
    }
}
