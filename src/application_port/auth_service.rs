use crate::domain_model::{Subject, UserId, UserLookup};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("missing refresh token")]
    MissingRefreshToken,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("refresh token expired or reused")]
    RefreshTokenReused,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user not found")]
    UserNotFound,
    #[error("token generation failed")]
    TokenGeneration,
    #[error("store call timed out")]
    Timeout,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Why a presented token did not decode. Never shown to clients.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("token subject is not a user id")]
    BadSubject,
    #[error("token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub lookup: UserLookup,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: Subject,
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TokenVerifyResult {
    pub user_id: UserId,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and checks both credential kinds. Pure CPU work, no I/O.
pub trait TokenCodec: Send + Sync {
    fn issue_access_token(&self, user: UserId) -> Result<(AccessToken, DateTime<Utc>), TokenError>;
    fn issue_refresh_token(
        &self,
        user: UserId,
    ) -> Result<(RefreshToken, DateTime<Utc>), TokenError>;
    fn verify_access_token(&self, token: &AccessToken) -> Result<TokenVerifyResult, TokenError>;
    fn verify_refresh_token(&self, token: &RefreshToken)
    -> Result<TokenVerifyResult, TokenError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;
    /// Access gate. `None` or an empty string counts as a missing token.
    async fn verify_token(&self, token: Option<&str>) -> Result<Subject, AuthError>;
    /// Single-use exchange of a refresh token for a new pair.
    async fn refresh_token(&self, refresh_token: Option<&str>) -> Result<AuthTokens, AuthError>;
    async fn logout(&self, user_id: UserId) -> Result<(), AuthError>;
}
